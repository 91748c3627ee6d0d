use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::construct::{Identifier, OtherHasher, ThingHasher, Triple};
use crate::error::Result;
use crate::mapper::EntityMapper;
use crate::store::{Store, TransactionMode, TransactionState, TriplePattern};

#[derive(Debug)]
enum Change {
    Inserted(Triple),
    Removed(Triple),
}

// ------------- MemoryStore -------------
/// A store keeping its triples in memory, indexed by subject.
///
/// Changes made inside a transaction are journaled so that `abort`
/// can undo them in reverse order.
#[derive(Debug)]
pub struct MemoryStore {
    mapper: Arc<EntityMapper>,
    kept: HashMap<Identifier, HashSet<Triple, OtherHasher>, ThingHasher>,
    length: usize,
    state: TransactionState,
    journal: Vec<Change>,
}

impl MemoryStore {
    pub fn new(mapper: Arc<EntityMapper>) -> Self {
        Self {
            mapper,
            kept: HashMap::default(),
            length: 0,
            state: TransactionState::None,
            journal: Vec::new(),
        }
    }
    /// Every triple currently held, in order.
    pub fn triples(&self) -> BTreeSet<Triple> {
        self.kept.values().flatten().cloned().collect()
    }
    fn keep(&mut self, triple: Triple) -> bool {
        let kept = self
            .kept
            .entry(triple.subject().clone())
            .or_default()
            .insert(triple);
        if kept {
            self.length += 1;
        }
        kept
    }
    fn release(&mut self, triple: &Triple) -> bool {
        let Some(bucket) = self.kept.get_mut(triple.subject()) else {
            return false;
        };
        let released = bucket.remove(triple);
        if bucket.is_empty() {
            self.kept.remove(triple.subject());
        }
        if released {
            self.length -= 1;
        }
        released
    }
    fn journaling(&self) -> bool {
        self.state != TransactionState::None
    }
}

impl Store for MemoryStore {
    fn begin(&mut self, mode: TransactionMode) -> Result<()> {
        if self.state == TransactionState::None {
            self.state = mode.into();
            debug!(?mode, "transaction begun");
        }
        Ok(())
    }
    fn commit(&mut self) -> Result<()> {
        if self.state != TransactionState::None {
            debug!(changes = self.journal.len(), "transaction committed");
            self.journal.clear();
            self.state = TransactionState::None;
        }
        Ok(())
    }
    fn abort(&mut self) -> Result<()> {
        if self.state != TransactionState::None {
            debug!(changes = self.journal.len(), "transaction aborted");
            while let Some(change) = self.journal.pop() {
                match change {
                    Change::Inserted(triple) => {
                        self.release(&triple);
                    }
                    Change::Removed(triple) => {
                        self.keep(triple);
                    }
                }
            }
            self.state = TransactionState::None;
        }
        Ok(())
    }
    fn transaction_state(&self) -> TransactionState {
        self.state
    }
    fn mapper(&self) -> &EntityMapper {
        &self.mapper
    }
    fn match_triples(&self, pattern: &TriplePattern) -> Result<Vec<Triple>> {
        let mut matched: Vec<Triple> = match &pattern.subject {
            Some(subject) => self
                .kept
                .get(subject)
                .into_iter()
                .flatten()
                .filter(|t| pattern.matches(t))
                .cloned()
                .collect(),
            None => self
                .kept
                .values()
                .flatten()
                .filter(|t| pattern.matches(t))
                .cloned()
                .collect(),
        };
        matched.sort_unstable();
        trace!(%pattern, matched = matched.len(), "pattern matched");
        Ok(matched)
    }
    fn insert_triples(&mut self, triples: &[Triple]) -> Result<()> {
        for triple in triples {
            if self.keep(triple.clone()) && self.journaling() {
                self.journal.push(Change::Inserted(triple.clone()));
            }
        }
        Ok(())
    }
    fn remove_triples(&mut self, triples: &[Triple]) -> Result<()> {
        for triple in triples {
            if self.release(triple) && self.journaling() {
                self.journal.push(Change::Removed(triple.clone()));
            }
        }
        Ok(())
    }
    fn len(&self) -> Result<usize> {
        Ok(self.length)
    }
}
