use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::construct::{Identifier, Kind, Thing, Triple, Value};
use crate::error::{Result, ThingraphError};
use crate::store::Store;

// ------------- Operation -------------
/// An atomic edit carrying exactly one triple's worth of intent.
///
/// `invert` swaps Create and Delete over the same triple, so inverting
/// twice gives back the original operation.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Operation {
    Create(Triple),
    Delete(Triple),
}

impl Operation {
    pub fn create(subject: Identifier, predicate: Identifier, object: impl Into<Value>) -> Self {
        Self::Create(Triple::new(subject, predicate, object))
    }
    pub fn delete(subject: Identifier, predicate: Identifier, object: impl Into<Value>) -> Self {
        Self::Delete(Triple::new(subject, predicate, object))
    }
    pub fn triple(&self) -> &Triple {
        match self {
            Self::Create(triple) | Self::Delete(triple) => triple,
        }
    }
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create(_))
    }
    pub fn invert(&self) -> Operation {
        match self {
            Self::Create(triple) => Self::Delete(triple.clone()),
            Self::Delete(triple) => Self::Create(triple.clone()),
        }
    }
    /// Applies the edit to the thing at the triple's subject.
    ///
    /// Create is not idempotent: creating a fact that is already present
    /// fails with `DuplicateTriple`. Deleting a fact that is not present
    /// fails with `TripleNotFound`.
    pub fn apply<S: Store + ?Sized>(&self, store: &mut S) -> Result<()> {
        let triple = self.triple();
        let current = store.get_for_update(triple.subject())?;
        match (self, current) {
            (Self::Create(_), None) => {
                let mut thing = Thing::new(triple.subject().clone(), Kind::generic());
                thing.add_value(triple.predicate().clone(), triple.object().clone());
                store.create(&thing)?;
            }
            (Self::Create(_), Some(mut thing)) => {
                if !thing.add_value(triple.predicate().clone(), triple.object().clone()) {
                    return Err(ThingraphError::DuplicateTriple { operation: self.clone() });
                }
                store.update(&thing)?;
            }
            (Self::Delete(_), None) => {
                return Err(ThingraphError::TripleNotFound { operation: self.clone() });
            }
            (Self::Delete(_), Some(mut thing)) => {
                if !thing.remove_value(triple.predicate(), triple.object()) {
                    return Err(ThingraphError::TripleNotFound { operation: self.clone() });
                }
                store.update(&thing)?;
            }
        }
        debug!(operation = %self, "operation applied");
        Ok(())
    }
}
impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Create(triple) => write!(f, "+ {}", triple),
            Self::Delete(triple) => write!(f, "- {}", triple),
        }
    }
}
