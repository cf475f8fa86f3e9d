use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Answer of a relation that may not be decidable when unknown values are involved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum TriState {
    Yes,
    No,
    Unknown,
}

impl TriState {
    pub fn from_bool(b: bool) -> TriState {
        if b {
            TriState::Yes
        } else {
            TriState::No
        }
    }

    pub fn join(self, other: TriState) -> TriState {
        if self == other {
            self
        } else {
            TriState::Unknown
        }
    }

    pub fn and(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::No, _) | (_, TriState::No) => TriState::No,
            (TriState::Yes, TriState::Yes) => TriState::Yes,
            _ => TriState::Unknown,
        }
    }

    pub fn or(self, other: TriState) -> TriState {
        match (self, other) {
            (TriState::Yes, _) | (_, TriState::Yes) => TriState::Yes,
            (TriState::No, TriState::No) => TriState::No,
            _ => TriState::Unknown,
        }
    }

    pub fn is_yes(self) -> bool {
        self == TriState::Yes
    }

    pub fn is_no(self) -> bool {
        self == TriState::No
    }
}

/// An element of a join semi-lattice with an absorbing top element.
///
/// The default `join_identical` is exact-or-top: two equal known values stay as they are,
/// anything else collapses to top. Composite values override it with a pointwise join.
pub trait Lattice: Clone + PartialEq {
    fn top() -> Self;

    fn is_top(&self) -> bool;

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        if self.is_top() || other.is_top() {
            (Self::top(), TriState::Unknown)
        } else if self == other {
            (self.clone(), TriState::Yes)
        } else {
            (Self::top(), TriState::No)
        }
    }

    fn join(&self, other: &Self) -> Self {
        self.join_identical(other).0
    }
}

/// An ordered list whose length or elements may be unknown.
///
/// Parameter lists, accessor coordinates and function descriptor arguments are all
/// described by this type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LatticeList<T> {
    Top,
    Complete(Vec<T>),
    /// The arity is unknown, only the listed positions are.
    Incomplete(BTreeMap<usize, T>),
}

impl<T: Lattice> LatticeList<T> {
    pub fn complete(items: Vec<T>) -> Self {
        LatticeList::Complete(items)
    }

    pub fn incomplete(known: BTreeMap<usize, T>) -> Self {
        if known.is_empty() {
            LatticeList::Top
        } else {
            LatticeList::Incomplete(known)
        }
    }

    pub fn is_top(&self) -> bool {
        matches!(self, LatticeList::Top)
    }

    pub fn len(&self) -> Option<usize> {
        match self {
            LatticeList::Complete(items) => Some(items.len()),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[T]> {
        match self {
            LatticeList::Complete(items) => Some(items),
            _ => None,
        }
    }

    /// `None` when `index` is past the end of a complete list, top when it is not known.
    pub fn get(&self, index: usize) -> Option<T> {
        match self {
            LatticeList::Top => Some(T::top()),
            LatticeList::Complete(items) => items.get(index).cloned(),
            LatticeList::Incomplete(known) => {
                Some(known.get(&index).cloned().unwrap_or_else(T::top))
            }
        }
    }

    pub fn known(&self) -> BTreeMap<usize, T> {
        match self {
            LatticeList::Top => BTreeMap::new(),
            LatticeList::Complete(items) => items.iter().cloned().enumerate().collect(),
            LatticeList::Incomplete(known) => known.clone(),
        }
    }

    pub fn map<U: Lattice>(&self, f: impl Fn(&T) -> U) -> LatticeList<U> {
        match self {
            LatticeList::Top => LatticeList::Top,
            LatticeList::Complete(items) => LatticeList::Complete(items.iter().map(f).collect()),
            LatticeList::Incomplete(known) => {
                LatticeList::incomplete(known.iter().map(|(i, t)| (*i, f(t))).collect())
            }
        }
    }

    pub fn map_indexed<U: Lattice>(&self, mut f: impl FnMut(usize, &T) -> U) -> LatticeList<U> {
        match self {
            LatticeList::Top => LatticeList::Top,
            LatticeList::Complete(items) => {
                LatticeList::Complete(items.iter().enumerate().map(|(i, t)| f(i, t)).collect())
            }
            LatticeList::Incomplete(known) => {
                LatticeList::incomplete(known.iter().map(|(i, t)| (*i, f(*i, t))).collect())
            }
        }
    }

    /// Inserts `items` before `pos`. The caller checks `pos` against a known length.
    pub fn insert_all(&self, pos: usize, items: &[T]) -> Self {
        match self {
            LatticeList::Complete(current) => {
                let mut result = current.clone();
                let at = pos.min(result.len());
                result.splice(at..at, items.iter().cloned());
                LatticeList::Complete(result)
            }
            LatticeList::Incomplete(known) => {
                let mut result: BTreeMap<usize, T> = known
                    .iter()
                    .map(|(i, t)| {
                        let i = if *i >= pos { *i + items.len() } else { *i };
                        (i, t.clone())
                    })
                    .collect();

                for (offset, item) in items.iter().enumerate() {
                    result.insert(pos + offset, item.clone());
                }

                LatticeList::Incomplete(result)
            }
            LatticeList::Top => LatticeList::incomplete(
                items
                    .iter()
                    .cloned()
                    .enumerate()
                    .map(|(offset, item)| (pos + offset, item))
                    .collect(),
            ),
        }
    }

    pub fn append_all(&self, items: &[T]) -> Self {
        match self {
            LatticeList::Complete(current) => {
                let mut result = current.clone();
                result.extend(items.iter().cloned());
                LatticeList::Complete(result)
            }
            // The new elements land at unknown positions.
            other => other.clone(),
        }
    }

    pub fn remove_range(&self, start: usize, end: usize) -> Self {
        let removed = end.saturating_sub(start);

        match self {
            LatticeList::Complete(current) => {
                let mut result = current.clone();
                let end = end.min(result.len());
                let start = start.min(end);
                result.drain(start..end);
                LatticeList::Complete(result)
            }
            LatticeList::Incomplete(known) => LatticeList::incomplete(
                known
                    .iter()
                    .filter(|(i, _)| **i < start || **i >= end)
                    .map(|(i, t)| {
                        let i = if *i >= end { *i - removed } else { *i };
                        (i, t.clone())
                    })
                    .collect(),
            ),
            LatticeList::Top => LatticeList::Top,
        }
    }

    pub fn replace(&self, index: usize, item: T) -> Self {
        match self {
            LatticeList::Complete(current) => {
                let mut result = current.clone();
                if let Some(slot) = result.get_mut(index) {
                    *slot = item;
                }
                LatticeList::Complete(result)
            }
            LatticeList::Incomplete(known) => {
                let mut result = known.clone();
                result.insert(index, item);
                LatticeList::incomplete(result)
            }
            LatticeList::Top => LatticeList::incomplete(BTreeMap::from([(index, item)])),
        }
    }

    pub fn render(&self, separator: &str) -> String
    where
        T: fmt::Display,
    {
        match self {
            LatticeList::Top => "{⊤}".to_string(),
            LatticeList::Complete(items) => items
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>()
                .join(separator),
            LatticeList::Incomplete(known) => known
                .iter()
                .map(|(i, t)| format!("{}={}", i, t))
                .collect::<Vec<_>>()
                .join(","),
        }
    }
}

impl<T: Lattice> Lattice for LatticeList<T> {
    fn top() -> Self {
        LatticeList::Top
    }

    fn is_top(&self) -> bool {
        matches!(self, LatticeList::Top)
    }

    fn join_identical(&self, other: &Self) -> (Self, TriState) {
        match (self, other) {
            (LatticeList::Top, _) | (_, LatticeList::Top) => (LatticeList::Top, TriState::Unknown),
            (LatticeList::Complete(a), LatticeList::Complete(b)) => {
                if a.len() != b.len() {
                    return (LatticeList::Top, TriState::No);
                }

                let mut identical = TriState::Yes;
                let items = a
                    .iter()
                    .zip(b)
                    .map(|(x, y)| {
                        let (joined, same) = x.join_identical(y);
                        identical = identical.and(same);
                        joined
                    })
                    .collect();

                (LatticeList::Complete(items), identical)
            }
            (a, b) => {
                let a = a.known();
                let b = b.known();

                let mut identical = TriState::Unknown;
                let mut joined = BTreeMap::new();

                for (i, x) in &a {
                    if let Some(y) = b.get(i) {
                        let (t, same) = x.join_identical(y);
                        if same.is_no() {
                            identical = TriState::No;
                        }
                        joined.insert(*i, t);
                    }
                }

                (LatticeList::incomplete(joined), identical)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Primitive, Type};

    fn int() -> Type {
        Type::Primitive(Primitive::Int)
    }

    fn long() -> Type {
        Type::Primitive(Primitive::Long)
    }

    #[test]
    fn complete_lists_join_pointwise() {
        let a = LatticeList::complete(vec![int(), int()]);
        let b = LatticeList::complete(vec![int(), long()]);

        let (joined, same) = a.join_identical(&b);

        assert_eq!(joined, LatticeList::complete(vec![int(), Type::Top]));
        assert_eq!(same, TriState::No);
        assert_eq!(a.join(&a), a);
    }

    #[test]
    fn lists_of_different_length_join_to_top() {
        let a = LatticeList::complete(vec![int()]);
        let b = LatticeList::complete(vec![int(), int()]);

        assert_eq!(a.join(&b), LatticeList::Top);
    }

    #[test]
    fn incomplete_join_keeps_shared_positions() {
        let a = LatticeList::incomplete(BTreeMap::from([(0, int()), (2, long())]));
        let b = LatticeList::complete(vec![int(), long(), int()]);

        assert_eq!(
            a.join(&b),
            LatticeList::Incomplete(BTreeMap::from([(0, int())]))
        );
    }

    #[test]
    fn empty_incomplete_list_is_top() {
        let list: LatticeList<Type> = LatticeList::incomplete(BTreeMap::new());
        assert!(list.is_top());
    }

    #[test]
    fn insert_into_top_gives_positions() {
        let list: LatticeList<Type> = LatticeList::Top;
        let inserted = list.insert_all(1, &[int(), long()]);

        assert_eq!(inserted.render(","), "1=int,2=long");
    }

    #[test]
    fn insert_shifts_incomplete_positions() {
        let list = LatticeList::incomplete(BTreeMap::from([(0, int()), (3, long())]));
        let inserted = list.insert_all(1, &[Type::Void]);

        assert_eq!(inserted.render(","), "0=int,1=void,4=long");
    }

    #[test]
    fn remove_range_shifts_tail() {
        let list = LatticeList::complete(vec![int(), long(), int()]);
        assert_eq!(list.remove_range(0, 2).render(","), "int");

        let list = LatticeList::incomplete(BTreeMap::from([(0, int()), (3, long())]));
        assert_eq!(list.remove_range(1, 2).render(","), "0=int,2=long");
    }
}
