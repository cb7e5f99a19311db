//! Weighted random selection over an action catalog
//!
//! The probability of drawing an action is `weight / total_weight`. Actions with
//! a weight of zero stay in the set (so they can be re-enabled through weight
//! overrides) but are never drawn.

use std::collections::{BTreeMap, HashSet};

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{ProfileError, Result};

/// An action paired with its relative weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedAction {
    #[serde(flatten)]
    pub action: Action,
    pub weight: u32,
}

impl WeightedAction {
    pub fn new(action: Action, weight: u32) -> Self {
        Self { action, weight }
    }
}

/// Immutable set of actions with a precomputed sampling table
#[derive(Debug, Clone)]
pub struct WeightedActionSet {
    entries: Vec<WeightedAction>,
    index: WeightedIndex<u64>,
    total_weight: u64,
}

impl WeightedActionSet {
    /// Build a set, validating every action.
    ///
    /// Fails when the set is empty, names repeat, or no weight is positive.
    pub fn new(entries: Vec<WeightedAction>) -> Result<Self> {
        if entries.is_empty() {
            return Err(ProfileError::EmptyActionSet);
        }

        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            entry.action.validate()?;
            if !seen.insert(entry.action.name.as_str()) {
                return Err(ProfileError::DuplicateAction(entry.action.name.clone()));
            }
        }

        let total_weight: u64 = entries.iter().map(|e| u64::from(e.weight)).sum();
        if total_weight == 0 {
            return Err(ProfileError::NoPositiveWeight);
        }

        let index = WeightedIndex::new(entries.iter().map(|e| u64::from(e.weight)))
            .map_err(|_| ProfileError::NoPositiveWeight)?;

        Ok(Self {
            entries,
            index,
            total_weight,
        })
    }

    /// Build from `(action, weight)` pairs
    pub fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (Action, u32)>,
    {
        Self::new(
            pairs
                .into_iter()
                .map(|(action, weight)| WeightedAction::new(action, weight))
                .collect(),
        )
    }

    /// Draw one action proportionally to its weight
    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> &WeightedAction {
        &self.entries[self.index.sample(rng)]
    }

    /// Copy of this set with some weights replaced by name.
    pub fn with_weights(&self, overrides: &BTreeMap<String, u32>) -> Result<Self> {
        let mut entries = self.entries.clone();
        for (name, weight) in overrides {
            let entry = entries
                .iter_mut()
                .find(|e| &e.action.name == name)
                .ok_or_else(|| ProfileError::UnknownAction(name.clone()))?;
            entry.weight = *weight;
        }
        Self::new(entries)
    }

    pub fn get(&self, name: &str) -> Option<&WeightedAction> {
        self.entries.iter().find(|e| e.action.name == name)
    }

    /// Selection probability of the named action
    pub fn probability(&self, name: &str) -> Option<f64> {
        self.get(name)
            .map(|e| f64::from(e.weight) / self.total_weight as f64)
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    pub fn iter(&self) -> impl Iterator<Item = &WeightedAction> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
