//! Tables the solvers learn into, and the policy they hand back.
//!
//! - [`ValueTable`]: state -> expected discounted return
//! - [`QTable`]: (state, action) -> action value, for legal pairs only
//! - [`Policy`]: state -> chosen action, immutable once built
//!
//! Each table remembers the order its states were added in. Sweeps and
//! extraction walk that order, so results never depend on hash order.

use std::hash::Hash;

use rustc_hash::FxHashMap;

use crate::mdp::bellman::argmax;

/// State values, one entry per known state.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueTable<S: Eq + Hash> {
    /// States in insertion order.
    order: Vec<S>,
    /// state -> value
    values: FxHashMap<S, f64>,
}

impl<S: Clone + Eq + Hash> ValueTable<S> {
    /// Create a table with every state mapped to 0.0.
    ///
    /// Duplicate states are kept once, at their first position.
    pub fn new<I: IntoIterator<Item = S>>(states: I) -> Self {
        let states = states.into_iter();
        let mut table = Self::with_capacity(states.size_hint().0);
        for state in states {
            if !table.values.contains_key(&state) {
                table.values.insert(state.clone(), 0.0);
                table.order.push(state);
            }
        }
        table
    }

    /// Create an empty table with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            order: Vec::with_capacity(capacity),
            values: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Get the value of a state, if the state is known.
    pub fn get(&self, state: &S) -> Option<f64> {
        self.values.get(state).copied()
    }

    /// Overwrite the value of a known state.
    ///
    /// Returns `false` and leaves the table untouched if the state is unknown.
    pub fn set(&mut self, state: &S, value: f64) -> bool {
        match self.values.get_mut(state) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Check if a state is in the table.
    pub fn contains(&self, state: &S) -> bool {
        self.values.contains_key(state)
    }

    /// States in their fixed order.
    pub fn states(&self) -> &[S] {
        &self.order
    }

    /// Iterate over `(state, value)` in the fixed order.
    pub fn iter(&self) -> impl Iterator<Item = (&S, f64)> {
        self.order.iter().map(move |s| (s, self.values[s]))
    }

    /// Number of states.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if the table has no states.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Largest absolute difference to another table over this table's states.
    ///
    /// States missing from `other` count as value 0.0 there.
    pub fn max_abs_diff(&self, other: &ValueTable<S>) -> f64 {
        self.iter()
            .map(|(s, v)| (v - other.get(s).unwrap_or(0.0)).abs())
            .fold(0.0, f64::max)
    }
}

/// Action values for every legal (state, action) pair.
///
/// Actions are stored per state in the order they were given, which is the
/// order ties are broken in.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable<S: Eq + Hash, A> {
    /// States in insertion order.
    order: Vec<S>,
    /// state -> [(action, q-value)]
    rows: FxHashMap<S, Vec<(A, f64)>>,
}

impl<S: Eq + Hash, A> Default for QTable<S, A> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            rows: FxHashMap::default(),
        }
    }
}

impl<S: Clone + Eq + Hash, A: Clone + PartialEq> QTable<S, A> {
    /// Create new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a state with all its legal actions at 0.0.
    ///
    /// Re-adding a known state resets its row.
    pub fn insert_state(&mut self, state: S, actions: Vec<A>) {
        let row = actions.into_iter().map(|a| (a, 0.0)).collect();
        if self.rows.insert(state.clone(), row).is_none() {
            self.order.push(state);
        }
    }

    /// Get Q(s, a), if the pair is in the table.
    pub fn get(&self, state: &S, action: &A) -> Option<f64> {
        self.rows
            .get(state)?
            .iter()
            .find(|(a, _)| a == action)
            .map(|&(_, q)| q)
    }

    /// Overwrite Q(s, a).
    ///
    /// Returns `false` and leaves the table untouched if the pair is unknown.
    pub fn set(&mut self, state: &S, action: &A, value: f64) -> bool {
        let slot = self
            .rows
            .get_mut(state)
            .and_then(|row| row.iter_mut().find(|(a, _)| a == action));
        match slot {
            Some((_, q)) => {
                *q = value;
                true
            }
            None => false,
        }
    }

    /// The legal actions recorded for a state, with their values.
    pub fn row(&self, state: &S) -> Option<&[(A, f64)]> {
        self.rows.get(state).map(Vec::as_slice)
    }

    /// max_a Q(s, a), or 0.0 if the state has no recorded actions.
    pub fn max_value(&self, state: &S) -> f64 {
        self.best(state).map_or(0.0, |(_, q)| q)
    }

    /// The first action attaining the maximum Q-value, with that value.
    pub fn best(&self, state: &S) -> Option<(&A, f64)> {
        let row = self.rows.get(state)?;
        argmax(row.iter().map(|(a, q)| (a, *q)))
    }

    /// States in their fixed order.
    pub fn states(&self) -> &[S] {
        &self.order
    }

    /// Number of (state, action) pairs stored.
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    /// Check if the table has no pairs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.order.clear();
        self.rows.clear();
    }
}

/// A state -> action mapping produced by a solver.
///
/// A policy is a snapshot: it owns its entries, so later training of the
/// solver that produced it does not change it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy<S: Eq + Hash, A> {
    actions: FxHashMap<S, A>,
}

impl<S: Eq + Hash, A> Policy<S, A> {
    /// Build a policy from any state -> action mapping.
    pub fn new<I: IntoIterator<Item = (S, A)>>(entries: I) -> Self {
        Self {
            actions: entries.into_iter().collect(),
        }
    }

    /// The action chosen for `state`.
    ///
    /// Returns `None` for terminal or unknown states.
    pub fn action_for(&self, state: &S) -> Option<&A> {
        self.actions.get(state)
    }

    /// Check if the policy has an entry for `state`.
    pub fn contains(&self, state: &S) -> bool {
        self.actions.contains_key(state)
    }

    /// Number of states with an action.
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Check if the policy is empty.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterate over entries in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (&S, &A)> {
        self.actions.iter()
    }
}

impl<S: Eq + Hash, A> FromIterator<(S, A)> for Policy<S, A> {
    fn from_iter<I: IntoIterator<Item = (S, A)>>(iter: I) -> Self {
        Self::new(iter)
    }
}

impl<S: Eq + Hash, A> From<FxHashMap<S, A>> for Policy<S, A> {
    fn from(actions: FxHashMap<S, A>) -> Self {
        Self { actions }
    }
}
