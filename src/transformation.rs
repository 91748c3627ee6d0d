use serde::{Deserialize, Serialize};
use tracing::info;

use crate::changeset::ChangeSet;
use crate::error::{Result, ThingraphError};
use crate::store::{transactionally, Store};

// ------------- Transformation -------------
/// An ordered sequence of change sets applied within one transaction.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct Transformation {
    change_sets: Vec<ChangeSet>,
}

impl Transformation {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn add(&mut self, changeset: ChangeSet) {
        self.change_sets.push(changeset);
    }
    pub fn len(&self) -> usize {
        self.change_sets.len()
    }
    pub fn is_empty(&self) -> bool {
        self.change_sets.is_empty()
    }
    pub fn change_sets(&self) -> &[ChangeSet] {
        &self.change_sets
    }
    /// Applies every change set in order. A failure is reported with the
    /// position of the failing change set and nothing is kept.
    pub fn apply<S: Store + ?Sized>(&self, store: &mut S) -> Result<()> {
        transactionally(store, |store| {
            for (index, changeset) in self.change_sets.iter().enumerate() {
                changeset
                    .apply(store)
                    .map_err(|source| ThingraphError::ChangeSetFailed {
                        index,
                        source: Box::new(source),
                    })?;
            }
            Ok(())
        })?;
        info!(change_sets = self.change_sets.len(), "transformation applied");
        Ok(())
    }
    /// Inverts every change set and reverses their order, so that the
    /// last change applied is the first one undone.
    pub fn invert(&self) -> Transformation {
        Transformation {
            change_sets: self.change_sets.iter().rev().map(ChangeSet::invert).collect(),
        }
    }
}
impl FromIterator<ChangeSet> for Transformation {
    fn from_iter<I: IntoIterator<Item = ChangeSet>>(change_sets: I) -> Self {
        Self {
            change_sets: change_sets.into_iter().collect(),
        }
    }
}
