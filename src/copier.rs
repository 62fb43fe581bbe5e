//! Identity-preserving deep copy of cyclic structures.
//!
//! A [`Copier`] walks a source structure from a starting key and clones
//! every node it reaches into a target structure exactly once. The mapping
//! from source key to copied key is recorded *before* a node's references
//! are followed, so back-references and cycles resolve to the copy that is
//! already under construction instead of recursing forever.
//!
//! The structure decides which references to follow through
//! [`Structure::deepen`]. A reference left as `None` (see
//! [`Copier::copy_opt`]) is carried over unchanged.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

/// A node store the [`Copier`] can clone from and into.
pub trait Structure {
    type Key: Copy + Eq + Hash + Debug;

    /// Clones the node behind `key` into `target` without touching its
    /// references, returning the new key. `None` when there is no such node.
    fn shallow_clone(&self, key: Self::Key, target: &mut Self) -> Option<Self::Key>;

    /// Rewrites the references of the freshly cloned node `key` in the
    /// copier's target, typically through [`Copier::copy`].
    fn deepen(copier: &mut Copier<'_, Self>, key: Self::Key)
    where
        Self: Sized;
}

/// Copies nodes of `source` into `target`, remembering each mapping.
pub struct Copier<'a, S: Structure> {
    source: &'a S,
    target: S,
    map: HashMap<S::Key, S::Key>,
}

impl<'a, S: Structure> Copier<'a, S> {
    pub fn new(source: &'a S, target: S) -> Self {
        Self {
            source,
            target,
            map: HashMap::new(),
        }
    }

    /// Returns the copy of `key`, cloning it first if it has not been
    /// copied yet.
    pub fn copy(&mut self, key: S::Key) -> Option<S::Key> {
        if let Some(copied) = self.map.get(&key) {
            return Some(*copied);
        }
        let copied = self.source.shallow_clone(key, &mut self.target)?;
        self.map.insert(key, copied);
        S::deepen(self, copied);
        Some(copied)
    }

    pub fn copy_opt(&mut self, key: Option<S::Key>) -> Option<S::Key> {
        key.and_then(|k| self.copy(k))
    }

    pub fn copy_all(&mut self, keys: &[S::Key]) -> Vec<S::Key> {
        keys.iter().filter_map(|k| self.copy(*k)).collect()
    }

    /// Copy already made for `key`, without copying anything new.
    pub fn get(&self, key: S::Key) -> Option<S::Key> {
        self.map.get(&key).copied()
    }

    pub fn contains(&self, key: S::Key) -> bool {
        self.map.contains_key(&key)
    }

    pub fn source(&self) -> &'a S {
        self.source
    }

    pub fn target(&self) -> &S {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut S {
        &mut self.target
    }

    /// Number of nodes copied so far.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Consumes the copier, returning the target and the identity map.
    pub fn finish(self) -> (S, HashMap<S::Key, S::Key>) {
        (self.target, self.map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Nodes with labels and arbitrary out-edges.
    #[derive(Debug, Default)]
    struct Net {
        nodes: Vec<(String, Vec<usize>)>,
    }

    impl Net {
        fn add(&mut self, label: &str) -> usize {
            self.nodes.push((label.to_string(), Vec::new()));
            self.nodes.len() - 1
        }

        fn link(&mut self, from: usize, to: usize) {
            self.nodes[from].1.push(to);
        }
    }

    impl Structure for Net {
        type Key = usize;

        fn shallow_clone(&self, key: usize, target: &mut Net) -> Option<usize> {
            let (label, edges) = self.nodes.get(key)?;
            target.nodes.push((label.clone(), edges.clone()));
            Some(target.nodes.len() - 1)
        }

        fn deepen(copier: &mut Copier<'_, Net>, key: usize) {
            let edges = copier.target().nodes[key].1.clone();
            let edges = copier.copy_all(&edges);
            copier.target_mut().nodes[key].1 = edges;
        }
    }

    #[test]
    fn cycles_terminate_and_close_in_the_copy() {
        let mut net = Net::default();
        let a = net.add("a");
        let b = net.add("b");
        let c = net.add("c");
        net.link(a, b);
        net.link(b, c);
        net.link(c, a);

        let mut copier = Copier::new(&net, Net::default());
        let root = copier.copy(a).unwrap();
        assert_eq!(copier.len(), 3);
        let (copy, map) = copier.finish();

        let b2 = copy.nodes[root].1[0];
        let c2 = copy.nodes[b2].1[0];
        assert_eq!(copy.nodes[c2].1, vec![root]);
        assert_eq!(copy.nodes[c2].0, "c");
        assert_eq!(map[&c], c2);
    }

    #[test]
    fn shared_references_map_to_one_copy() {
        let mut net = Net::default();
        let top = net.add("top");
        let left = net.add("left");
        let right = net.add("right");
        let shared = net.add("shared");
        net.link(top, left);
        net.link(top, right);
        net.link(left, shared);
        net.link(right, shared);

        let mut copier = Copier::new(&net, Net::default());
        copier.copy(top);
        let (copy, map) = copier.finish();

        assert_eq!(copy.nodes.len(), 4);
        let l = map[&left];
        let r = map[&right];
        assert_eq!(copy.nodes[l].1, copy.nodes[r].1);
    }

    #[test]
    fn missing_and_absent_keys_copy_to_none() {
        let net = Net::default();
        let mut copier = Copier::new(&net, Net::default());
        assert_eq!(copier.copy(7), None);
        assert_eq!(copier.copy_opt(None), None);
        assert!(copier.is_empty());
    }

    #[test]
    fn copy_is_idempotent_per_key() {
        let mut net = Net::default();
        let a = net.add("a");
        net.link(a, a);

        let mut copier = Copier::new(&net, Net::default());
        let first = copier.copy(a);
        let second = copier.copy(a);
        assert_eq!(first, second);
        assert_eq!(copier.get(a), first);
        assert_eq!(copier.target().nodes.len(), 1);
    }
}
