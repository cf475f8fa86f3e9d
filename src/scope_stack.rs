use crate::lattice::Lattice;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Clone, Debug, PartialEq)]
pub struct ScopeStack<K, V>
where
    K: Hash + Eq,
{
    stack: Vec<HashMap<K, V>>,
}

impl<K, V> Default for ScopeStack<K, V>
where
    K: Hash + Eq,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> ScopeStack<K, V>
where
    K: Hash + Eq,
{
    pub fn new() -> Self {
        ScopeStack { stack: Vec::new() }
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        for scope in self.stack.iter().rev() {
            if let result @ Some(_) = scope.get(key) {
                return result;
            }
        }

        None
    }

    pub fn push_empty_scope(&mut self) {
        self.stack.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.stack.pop();
    }

    pub fn insert(&mut self, key: K, item: V) {
        if let Some(top) = self.stack.last_mut() {
            top.insert(key, item);
        }
    }

    /// Overwrites the binding `key` resolves to. Returns false if there is none.
    pub fn assign(&mut self, key: &K, item: V) -> bool {
        for scope in self.stack.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(key) {
                *slot = item;
                return true;
            }
        }

        false
    }
}

impl<K, V> ScopeStack<K, V>
where
    K: Hash + Eq + Clone,
    V: Lattice,
{
    /// Joins the bindings of two stacks forked from the same state. Scopes opened on
    /// only one side have been popped already, so the shapes agree.
    pub fn join(&self, other: &Self) -> Self {
        let stack = self
            .stack
            .iter()
            .zip(&other.stack)
            .map(|(ours, theirs)| {
                ours.iter()
                    .filter_map(|(key, value)| {
                        theirs
                            .get(key)
                            .map(|other| (key.clone(), value.join(other)))
                    })
                    .collect()
            })
            .collect();

        ScopeStack { stack }
    }

    /// Replaces every binding that differs in `next` with top.
    pub fn widen_changed(&self, next: &Self) -> Self {
        let stack = self
            .stack
            .iter()
            .zip(&next.stack)
            .map(|(ours, theirs)| {
                ours.iter()
                    .map(|(key, value)| match theirs.get(key) {
                        Some(other) if other == value => (key.clone(), value.clone()),
                        _ => (key.clone(), V::top()),
                    })
                    .collect()
            })
            .collect();

        ScopeStack { stack }
    }
}
