use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::construct::{Identifier, Value};
use crate::error::Result;
use crate::operation::Operation;
use crate::store::{transactionally, Store};

// ------------- ChangeSet -------------
/// A batch of operations applied as one unit: every delete first, then
/// every create.
///
/// Deleting before creating lets a batch replace a value in place, since
/// the new value never collides with the old one.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default)]
    deletes: Vec<Operation>,
    #[serde(default)]
    creates: Vec<Operation>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
    pub fn create(mut self, subject: Identifier, predicate: Identifier, object: impl Into<Value>) -> Self {
        self.creates.push(Operation::create(subject, predicate, object));
        self
    }
    pub fn delete(mut self, subject: Identifier, predicate: Identifier, object: impl Into<Value>) -> Self {
        self.deletes.push(Operation::delete(subject, predicate, object));
        self
    }
    pub fn push(&mut self, operation: Operation) {
        match operation {
            Operation::Create(_) => self.creates.push(operation),
            Operation::Delete(_) => self.deletes.push(operation),
        }
    }
    pub fn deletes(&self) -> &[Operation] {
        &self.deletes
    }
    pub fn creates(&self) -> &[Operation] {
        &self.creates
    }
    /// Every operation in application order.
    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.deletes.iter().chain(self.creates.iter())
    }
    pub fn len(&self) -> usize {
        self.deletes.len() + self.creates.len()
    }
    pub fn is_empty(&self) -> bool {
        self.deletes.is_empty() && self.creates.is_empty()
    }
    /// Fails on the first rejected operation, leaving the store as it was
    /// unless the caller holds an enclosing transaction.
    pub fn apply<S: Store + ?Sized>(&self, store: &mut S) -> Result<()> {
        transactionally(store, |store| {
            for operation in self.operations() {
                operation.apply(store)?;
            }
            Ok(())
        })?;
        info!(
            label = self.label().unwrap_or_default(),
            deletes = self.deletes.len(),
            creates = self.creates.len(),
            "change set applied"
        );
        Ok(())
    }
    /// The change set undoing this one. Inverted creates become the
    /// deletes, inverted deletes become the creates.
    pub fn invert(&self) -> ChangeSet {
        ChangeSet {
            label: self.label.as_ref().map(|label| format!("undo {}", label)),
            deletes: self.creates.iter().map(Operation::invert).collect(),
            creates: self.deletes.iter().map(Operation::invert).collect(),
        }
    }
}
impl From<Vec<Operation>> for ChangeSet {
    fn from(operations: Vec<Operation>) -> Self {
        let mut changeset = ChangeSet::new();
        for operation in operations {
            changeset.push(operation);
        }
        changeset
    }
}
impl Extend<Operation> for ChangeSet {
    fn extend<I: IntoIterator<Item = Operation>>(&mut self, operations: I) {
        for operation in operations {
            self.push(operation);
        }
    }
}
impl fmt::Display for ChangeSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "# {}", label)?;
        }
        for (i, operation) in self.operations().enumerate() {
            if i > 0 || self.label.is_some() {
                writeln!(f)?;
            }
            write!(f, "{}", operation)?;
        }
        Ok(())
    }
}
