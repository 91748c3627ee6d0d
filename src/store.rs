//! The storage contract every operation is expressed against.
//!
//! An adapter provides transaction scoping and four primitives (the mapper,
//! pattern lookup, bulk insert and bulk remove). Everything else, point
//! lookups, per-thing writes, predicate searches and construct queries, is
//! provided on top of those primitives and funnels its triples through the
//! adapter's [`EntityMapper`].

use std::collections::BTreeSet;
use std::fmt;

use tracing::{debug, warn};

use crate::construct::{Identifier, Thing, Triple, Value};
use crate::error::{Result, ThingraphError};
use crate::mapper::{EntityMapper, Resolution};
use crate::query::ConstructQuery;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionState {
    None,
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransactionMode {
    Read,
    Write,
}
impl From<TransactionMode> for TransactionState {
    fn from(mode: TransactionMode) -> Self {
        match mode {
            TransactionMode::Read => Self::Read,
            TransactionMode::Write => Self::Write,
        }
    }
}

// ------------- Patterns -------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectPattern {
    Any,
    Exact(Value),
    /// Matches literals only, comparing lowercased lexical forms.
    LiteralIgnoreCase(String),
}

impl ObjectPattern {
    pub fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Self::Any, _) => true,
            (Self::Exact(expected), value) => expected == value,
            (Self::LiteralIgnoreCase(expected), Value::Literal(lexical)) => {
                lexical.to_lowercase() == expected.to_lowercase()
            }
            (Self::LiteralIgnoreCase(_), Value::Reference(_)) => false,
        }
    }
}

/// A single triple pattern; `None` positions match anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Option<Identifier>,
    pub predicate: Option<Identifier>,
    pub object: ObjectPattern,
}

impl TriplePattern {
    pub fn any() -> Self {
        Self {
            subject: None,
            predicate: None,
            object: ObjectPattern::Any,
        }
    }
    pub fn subject(subject: Identifier) -> Self {
        Self {
            subject: Some(subject),
            ..Self::any()
        }
    }
    pub fn predicate(predicate: Identifier) -> Self {
        Self {
            predicate: Some(predicate),
            ..Self::any()
        }
    }
    pub fn with_object(mut self, object: ObjectPattern) -> Self {
        self.object = object;
        self
    }
    pub fn matches(&self, triple: &Triple) -> bool {
        self.subject.as_ref().is_none_or(|s| s == triple.subject())
            && self.predicate.as_ref().is_none_or(|p| p == triple.predicate())
            && self.object.matches(triple.object())
    }
}
impl fmt::Display for TriplePattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.subject {
            Some(s) => write!(f, "{} ", s)?,
            None => write!(f, "* ")?,
        }
        match &self.predicate {
            Some(p) => write!(f, "{} ", p)?,
            None => write!(f, "* ")?,
        }
        match &self.object {
            ObjectPattern::Any => write!(f, "*"),
            ObjectPattern::Exact(value) => write!(f, "{}", value),
            ObjectPattern::LiteralIgnoreCase(lexical) => write!(f, "~\"{}\"", lexical),
        }
    }
}

// ------------- Store -------------
pub trait Store {
    /// Beginning while a transaction is open is a no-op.
    fn begin(&mut self, mode: TransactionMode) -> Result<()>;
    /// Committing with no open transaction is a no-op.
    fn commit(&mut self) -> Result<()>;
    /// Aborting with no open transaction is a no-op.
    fn abort(&mut self) -> Result<()>;
    fn transaction_state(&self) -> TransactionState;

    fn mapper(&self) -> &EntityMapper;
    fn match_triples(&self, pattern: &TriplePattern) -> Result<Vec<Triple>>;
    /// Triples already present are ignored.
    fn insert_triples(&mut self, triples: &[Triple]) -> Result<()>;
    /// Triples not present are ignored.
    fn remove_triples(&mut self, triples: &[Triple]) -> Result<()>;

    fn len(&self) -> Result<usize> {
        Ok(self.match_triples(&TriplePattern::any())?.len())
    }
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
    fn get(&self, identifier: &Identifier) -> Result<Option<Thing>> {
        let triples = self.match_triples(&TriplePattern::subject(identifier.clone()))?;
        self.mapper().reconstruct_one(identifier, triples, Resolution::Strict)
    }
    /// Like [`Store::get`], but an untyped subject is returned as a generic
    /// thing instead of failing.
    fn get_for_update(&self, identifier: &Identifier) -> Result<Option<Thing>> {
        let triples = self.match_triples(&TriplePattern::subject(identifier.clone()))?;
        self.mapper().reconstruct_one(identifier, triples, Resolution::Lenient)
    }
    fn create(&mut self, thing: &Thing) -> Result<()> {
        let triples: Vec<Triple> = thing.triples().collect();
        self.insert_triples(&triples)
    }
    /// Replaces every triple of the thing's subject with the thing's facts.
    fn update(&mut self, thing: &Thing) -> Result<()> {
        let existing = self.match_triples(&TriplePattern::subject(thing.identifier().clone()))?;
        self.remove_triples(&existing)?;
        self.create(thing)
    }
    fn delete(&mut self, thing: &Thing) -> Result<()> {
        let triples: Vec<Triple> = thing.triples().collect();
        self.remove_triples(&triples)
    }
    fn find_by_predicate(&self, predicate: &Identifier, object: &Value) -> Result<Vec<Thing>> {
        let pattern = TriplePattern::predicate(predicate.clone())
            .with_object(ObjectPattern::Exact(object.clone()));
        self.find_matching(&pattern)
    }
    fn find_by_predicate_only(&self, predicate: &Identifier) -> Result<Vec<Thing>> {
        self.find_matching(&TriplePattern::predicate(predicate.clone()))
    }
    fn find_by_predicate_case_insensitive(&self, predicate: &Identifier, lexical: &str) -> Result<Vec<Thing>> {
        let pattern = TriplePattern::predicate(predicate.clone())
            .with_object(ObjectPattern::LiteralIgnoreCase(lexical.to_owned()));
        self.find_matching(&pattern)
    }
    /// Reconstructs every thing having at least one triple matching the pattern.
    fn find_matching(&self, pattern: &TriplePattern) -> Result<Vec<Thing>> {
        let subjects: BTreeSet<Identifier> = self
            .match_triples(pattern)?
            .into_iter()
            .map(|t| t.subject().clone())
            .collect();
        let mut triples = Vec::new();
        for subject in subjects {
            triples.extend(self.match_triples(&TriplePattern::subject(subject))?);
        }
        self.mapper().reconstruct(triples)
    }
    fn execute_construct(&self, query: &ConstructQuery) -> Result<Vec<Thing>> {
        let triples = query.evaluate(self)?;
        self.mapper().reconstruct(triples)
    }
}

/// Runs `work` as one all-or-nothing unit.
///
/// With no transaction open, a write transaction is begun, committed when
/// `work` succeeds and aborted when it fails. With a write transaction
/// already open, `work` runs inside the caller's scope and the caller
/// decides. A read transaction held by the caller is never upgraded, so
/// `work` is refused and the caller's transaction stays open.
pub fn transactionally<S, T, F>(store: &mut S, work: F) -> Result<T>
where
    S: Store + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    match store.transaction_state() {
        TransactionState::Write => return work(&mut *store),
        TransactionState::Read => {
            return Err(ThingraphError::Store(
                "Cannot write inside a read transaction".to_owned(),
            ));
        }
        TransactionState::None => (),
    }
    store.begin(TransactionMode::Write)?;
    match work(&mut *store) {
        Ok(value) => match store.commit() {
            Ok(()) => Ok(value),
            Err(error) => {
                if let Err(abort_error) = store.abort() {
                    warn!(error = %abort_error, "abort after failed commit also failed");
                }
                Err(error)
            }
        },
        Err(error) => {
            debug!(%error, "aborting transaction");
            if let Err(abort_error) = store.abort() {
                warn!(error = %abort_error, "abort failed");
            }
            Err(error)
        }
    }
}
