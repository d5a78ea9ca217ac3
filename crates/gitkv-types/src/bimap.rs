//! A bijective map kept as two one-directional hash maps.
//!
//! Every left value maps to exactly one right value and vice versa. The
//! forward and inverse maps are always mutated together; construction
//! rejects input that would make them disagree.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{TypeError, TypeResult};

#[derive(Clone, Debug)]
pub struct BiMap<L, R> {
    forward: HashMap<L, R>,
    inverse: HashMap<R, L>,
}

impl<L, R> BiMap<L, R>
where
    L: Eq + Hash + Clone + Debug,
    R: Eq + Hash + Clone + Debug,
{
    pub fn new() -> Self {
        Self {
            forward: HashMap::new(),
            inverse: HashMap::new(),
        }
    }

    /// Build from pairs. Fails if either side repeats.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (L, R)>) -> TypeResult<Self> {
        let mut forward = HashMap::new();
        let mut inverse = HashMap::new();
        for (left, right) in pairs {
            if forward.contains_key(&left) || inverse.contains_key(&right) {
                return Err(TypeError::BreakingBijection(format!(
                    "{left:?} <-> {right:?} repeats an earlier pair"
                )));
            }
            forward.insert(left.clone(), right.clone());
            inverse.insert(right, left);
        }
        if forward.len() != inverse.len() {
            return Err(TypeError::BreakingBijection(format!(
                "{} left values but {} right values",
                forward.len(),
                inverse.len()
            )));
        }
        Ok(Self { forward, inverse })
    }

    /// Bind `left` to `right`, replacing any previous binding of `left`.
    ///
    /// Fails if `right` is already bound to a different left value.
    /// Returns the right value `left` was previously bound to.
    pub fn insert(&mut self, left: L, right: R) -> TypeResult<Option<R>> {
        if let Some(owner) = self.inverse.get(&right) {
            if *owner != left {
                return Err(TypeError::BreakingBijection(format!(
                    "{right:?} is already bound to {owner:?}"
                )));
            }
        }
        let previous = self.forward.insert(left.clone(), right.clone());
        if let Some(old) = &previous {
            self.inverse.remove(old);
        }
        self.inverse.insert(right, left);
        Ok(previous)
    }

    /// Bind `left` to `right`, evicting whatever pairs either value was in.
    pub fn force_insert(&mut self, left: L, right: R) {
        self.remove_left(&left);
        self.remove_right(&right);
        self.forward.insert(left.clone(), right.clone());
        self.inverse.insert(right, left);
    }

    pub fn get_by_left(&self, left: &L) -> Option<&R> {
        self.forward.get(left)
    }

    pub fn get_by_right(&self, right: &R) -> Option<&L> {
        self.inverse.get(right)
    }

    pub fn remove_left(&mut self, left: &L) -> Option<R> {
        let right = self.forward.remove(left)?;
        self.inverse.remove(&right);
        Some(right)
    }

    pub fn remove_right(&mut self, right: &R) -> Option<L> {
        let left = self.inverse.remove(right)?;
        self.forward.remove(&left);
        Some(left)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&L, &R)> {
        self.forward.iter()
    }
}

impl<L, R> Default for BiMap<L, R>
where
    L: Eq + Hash + Clone + Debug,
    R: Eq + Hash + Clone + Debug,
{
    fn default() -> Self {
        Self::new()
    }
}
