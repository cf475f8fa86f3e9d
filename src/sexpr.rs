use crate::source_location::{SourceLocation, SourceSpan};
use std::str::Chars;
use thiserror::Error;

enum CodeChar {
    EndOfSource {
        offset: usize,
    },
    Char {
        ch: char,
        loc: SourceLocation,
        offset: usize,
    },
}

struct CodeCharIterator<'a> {
    it: Chars<'a>,
    loc: SourceLocation,
    last_loc: SourceLocation,
    offset: usize,
    has_sent_end: bool,
    peeked: Option<CodeChar>,
    peeked_loc: SourceLocation,
}

impl<'a> CodeCharIterator<'a> {
    fn new(source: &'a str) -> Self {
        CodeCharIterator {
            it: source.chars(),
            loc: SourceLocation::new(1, 1),
            last_loc: SourceLocation::new(1, 1),
            offset: 0,
            has_sent_end: false,
            peeked: None,
            peeked_loc: SourceLocation::new(1, 1),
        }
    }

    fn peek(&mut self) -> Option<&CodeChar> {
        if self.peeked.is_none() {
            let last_loc = self.last_loc;
            self.peeked = self.next();
            self.peeked_loc = self.last_loc;
            self.last_loc = last_loc;
        }

        self.peeked.as_ref()
    }

    fn peek_char(&mut self) -> Option<char> {
        match self.peek() {
            Some(CodeChar::Char { ch, .. }) => Some(*ch),
            _ => None,
        }
    }

    fn peek_offset(&mut self) -> usize {
        match self.peek() {
            Some(CodeChar::Char { offset, .. }) | Some(CodeChar::EndOfSource { offset }) => *offset,
            None => self.offset,
        }
    }
}

impl<'a> Iterator for CodeCharIterator<'a> {
    type Item = CodeChar;

    fn next(&mut self) -> Option<CodeChar> {
        if self.peeked.is_some() {
            self.last_loc = self.peeked_loc;
            return self.peeked.take();
        }

        if let Some(c) = self.it.next() {
            let cc = Some(CodeChar::Char {
                ch: c,
                loc: self.loc,
                offset: self.offset,
            });

            self.last_loc = self.loc;

            self.offset += c.len_utf8();

            if c == '\n' {
                self.loc.line += 1;
                self.loc.col = 1;
            } else {
                self.loc.col += 1;
            }

            cc
        } else if !self.has_sent_end {
            self.has_sent_end = true;
            Some(CodeChar::EndOfSource {
                offset: self.offset,
            })
        } else {
            None
        }
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TokenKind<'a> {
    BraceOpen,
    BraceClose,
    Atom(&'a str),
    /// The text between the quotes, escapes not yet processed.
    StringLit(&'a str),
}

#[derive(Debug, PartialEq)]
pub struct Token<'a> {
    pub kind: TokenKind<'a>,
    pub span: SourceSpan,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{0}: unmatched closing brace")]
    UnmatchedClosingBrace(SourceLocation),
    #[error("{0}: unmatched opening brace")]
    UnmatchedOpeningBrace(SourceLocation),
    #[error("{0}: unterminated literal")]
    UnterminatedLiteral(SourceLocation),
}

/// Splits fixture source into tokens. `;` starts a comment running to the end of the line.
pub struct Tokenizer<'a> {
    source: &'a str,
    it: CodeCharIterator<'a>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Tokenizer<'a> {
        Tokenizer {
            source,
            it: CodeCharIterator::new(source),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        let mut in_comment = false;

        while let Some(ch) = self.it.peek_char() {
            if in_comment {
                in_comment = ch != '\n';
            } else if ch == ';' {
                in_comment = true;
            } else if !ch.is_whitespace() {
                break;
            }

            self.it.next();
        }
    }

    fn last_location(&self) -> SourceLocation {
        self.it.last_loc
    }

    /// Consumes a quoted literal whose opening `quote` was already read. Returns the
    /// offset of the closing quote.
    fn quoted(&mut self, quote: char, start: SourceLocation) -> Result<usize, ParseError> {
        let mut escaped = false;

        loop {
            match self.it.next() {
                Some(CodeChar::Char { ch, offset, .. }) => {
                    if escaped {
                        escaped = false;
                    } else if ch == '\\' {
                        escaped = true;
                    } else if ch == quote {
                        return Ok(offset);
                    }
                }
                _ => return Err(ParseError::UnterminatedLiteral(start)),
            }
        }
    }

    fn next_token(&mut self) -> Option<Result<Token<'a>, ParseError>> {
        self.skip_whitespace_and_comments();

        let CodeChar::Char { ch, loc, offset } = self.it.next()? else {
            return None;
        };

        let kind = match ch {
            '(' => TokenKind::BraceOpen,
            ')' => TokenKind::BraceClose,
            '"' => match self.quoted('"', loc) {
                Ok(end) => TokenKind::StringLit(&self.source[offset + 1..end]),
                Err(e) => return Some(Err(e)),
            },
            '\'' => match self.quoted('\'', loc) {
                Ok(end) => TokenKind::Atom(&self.source[offset..end + 1]),
                Err(e) => return Some(Err(e)),
            },
            _ => {
                // Consume until whitespace, a brace or a comment.
                while let Some(ch) = self.it.peek_char() {
                    if ch.is_whitespace() || ch == '(' || ch == ')' || ch == ';' {
                        break;
                    }

                    self.it.next();
                }

                let end = self.it.peek_offset();
                TokenKind::Atom(&self.source[offset..end])
            }
        };

        Some(Ok(Token {
            kind,
            span: SourceSpan::new(loc, self.last_location()),
        }))
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SExpr<'a> {
    pub span: SourceSpan,
    pub kind: SExprKind<'a>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum SExprKind<'a> {
    List(Vec<SExpr<'a>>),
    Atom(&'a str),
    LitString(&'a str),
}

impl<'a> SExpr<'a> {
    pub fn as_atom(&self) -> Option<&'a str> {
        match self.kind {
            SExprKind::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[SExpr<'a>]> {
        match &self.kind {
            SExprKind::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Parses a whole source into the list of its top-level expressions.
pub fn parse(source: &str) -> Result<Vec<SExpr<'_>>, ParseError> {
    let mut stack: Vec<(SourceSpan, Vec<SExpr>)> = Vec::new();
    let mut top = Vec::new();

    for token in Tokenizer::new(source) {
        let token = token?;

        let sexpr = match token.kind {
            TokenKind::BraceOpen => {
                stack.push((token.span, Vec::new()));
                continue;
            }
            TokenKind::BraceClose => {
                let Some((span, items)) = stack.pop() else {
                    return Err(ParseError::UnmatchedClosingBrace(token.span.start));
                };

                SExpr {
                    span: SourceSpan::new(span.start, token.span.end),
                    kind: SExprKind::List(items),
                }
            }
            TokenKind::Atom(atom) => SExpr {
                span: token.span,
                kind: SExprKind::Atom(atom),
            },
            TokenKind::StringLit(s) => SExpr {
                span: token.span,
                kind: SExprKind::LitString(s),
            },
        };

        match stack.last_mut() {
            Some((_, items)) => items.push(sexpr),
            None => top.push(sexpr),
        }
    }

    if let Some((span, _)) = stack.last() {
        return Err(ParseError::UnmatchedOpeningBrace(span.start));
    }

    Ok(top)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind<'_>> {
        Tokenizer::new(source).map(|t| t.unwrap().kind).collect()
    }

    #[test]
    fn tokens() {
        use TokenKind::*;

        assert_eq!(
            kinds("(let x (.bindTo mh \"a \\\"b\\\"\")) ; comment\n'('"),
            vec![
                BraceOpen,
                Atom("let"),
                Atom("x"),
                BraceOpen,
                Atom(".bindTo"),
                Atom("mh"),
                StringLit("a \\\"b\\\""),
                BraceClose,
                BraceClose,
                Atom("'('"),
            ]
        );
    }

    #[test]
    fn spans_cover_lists() {
        let parsed = parse("(a\n  (b c))").unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].span.start, SourceLocation::new(1, 1));
        assert_eq!(parsed[0].span.end, SourceLocation::new(2, 8));

        let items = parsed[0].as_list().unwrap();
        assert_eq!(items[1].span.start, SourceLocation::new(2, 3));
        assert_eq!(items[1].as_list().unwrap()[1].as_atom(), Some("c"));
    }

    #[test]
    fn unbalanced() {
        assert_eq!(
            parse("(a))"),
            Err(ParseError::UnmatchedClosingBrace(SourceLocation::new(1, 4)))
        );
        assert_eq!(
            parse("(a (b)"),
            Err(ParseError::UnmatchedOpeningBrace(SourceLocation::new(1, 1)))
        );
        assert_eq!(
            parse("\"abc"),
            Err(ParseError::UnterminatedLiteral(SourceLocation::new(1, 1)))
        );
    }
}
