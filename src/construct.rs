// used to keep the one-to-one mapping between prefixes and namespace IRIs
use bimap::BiMap;

use core::hash::BuildHasherDefault;
use std::collections::{BTreeMap, BTreeSet};
use std::hash::{Hash, Hasher};
use seahash::SeaHasher;
use std::cmp::Ordering;
use std::sync::Arc;

// used to print out readable forms of a construct
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ThingraphError};

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
/// The reserved "is-a type" predicate.
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub type ThingHasher = BuildHasherDefault<SeaHasher>;
pub type OtherHasher = BuildHasherDefault<SeaHasher>;

lazy_static! {
    static ref IRI: Regex = Regex::new(r#"^[^\s<>"]+$"#).unwrap();
}

// ------------- Identifier -------------
/// An opaque, globally unique reference naming an entity or a predicate.
///
/// The namespace/local split is kept for display and registry lookups, but
/// identity is the full string: two identifiers are equal iff their
/// resolved IRIs are equal, however they were split.
#[derive(Clone, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Identifier {
    iri: Arc<str>,
    split: usize,
}

impl Identifier {
    /// Joins the two parts, which must form a valid IRI together.
    pub fn new(namespace: &str, local: &str) -> Result<Self> {
        let mut iri = String::with_capacity(namespace.len() + local.len());
        iri.push_str(namespace);
        iri.push_str(local);
        validate(&iri)?;
        Ok(Self {
            iri: Arc::from(iri),
            split: namespace.len(),
        })
    }
    pub fn parse(iri: &str) -> Result<Self> {
        validate(iri)?;
        let split = iri.rfind(['#', '/']).map(|i| i + 1).unwrap_or(0);
        Ok(Self {
            iri: Arc::from(iri),
            split,
        })
    }
    pub fn as_str(&self) -> &str {
        &self.iri
    }
    pub fn namespace(&self) -> &str {
        &self.iri[..self.split]
    }
    pub fn local_name(&self) -> &str {
        &self.iri[self.split..]
    }
    pub fn in_namespace(&self, namespace: &str) -> bool {
        self.iri.starts_with(namespace)
    }
}
impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.iri == other.iri
    }
}
impl Eq for Identifier {}
impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.iri.hash(state);
    }
}
impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.iri.cmp(&other.iri)
    }
}
impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}>", self.iri)
    }
}
impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "<{}>", self.iri)
    }
}
impl TryFrom<String> for Identifier {
    type Error = ThingraphError;
    fn try_from(iri: String) -> Result<Self> {
        Self::parse(&iri)
    }
}
impl From<Identifier> for String {
    fn from(identifier: Identifier) -> Self {
        identifier.iri.to_string()
    }
}

fn validate(iri: &str) -> Result<()> {
    if IRI.is_match(iri) {
        Ok(())
    } else {
        Err(ThingraphError::parse(format!("'{}' is not a valid IRI", iri)))
    }
}

pub fn rdf_type() -> Identifier {
    Identifier {
        iri: Arc::from(RDF_TYPE),
        split: RDF.len(),
    }
}

// ------------- Value -------------
/// The object position of a triple: a link to another entity or a scalar.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum Value {
    Reference(Identifier),
    Literal(String),
}

impl Value {
    pub fn literal(lexical: impl Into<String>) -> Self {
        Self::Literal(lexical.into())
    }
    pub fn as_reference(&self) -> Option<&Identifier> {
        match self {
            Self::Reference(identifier) => Some(identifier),
            Self::Literal(_) => None,
        }
    }
    pub fn as_literal(&self) -> Option<&str> {
        match self {
            Self::Reference(_) => None,
            Self::Literal(lexical) => Some(lexical),
        }
    }
}
impl From<Identifier> for Value {
    fn from(identifier: Identifier) -> Self {
        Self::Reference(identifier)
    }
}
impl From<&str> for Value {
    fn from(lexical: &str) -> Self {
        Self::Literal(lexical.to_owned())
    }
}
impl From<String> for Value {
    fn from(lexical: String) -> Self {
        Self::Literal(lexical)
    }
}
impl From<i64> for Value {
    fn from(number: i64) -> Self {
        Self::Literal(number.to_string())
    }
}
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Reference(identifier) => write!(f, "{}", identifier),
            Self::Literal(lexical) => {
                write!(f, "\"{}\"", lexical.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }
}

// ------------- Triple -------------
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Triple {
    subject: Identifier,
    predicate: Identifier,
    object: Value,
}

impl Triple {
    pub fn new(subject: Identifier, predicate: Identifier, object: impl Into<Value>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
        }
    }
    pub fn subject(&self) -> &Identifier {
        &self.subject
    }
    pub fn predicate(&self) -> &Identifier {
        &self.predicate
    }
    pub fn object(&self) -> &Value {
        &self.object
    }
    pub fn into_parts(self) -> (Identifier, Identifier, Value) {
        (self.subject, self.predicate, self.object)
    }
    pub fn is_type_assertion(&self) -> bool {
        self.predicate.as_str() == RDF_TYPE
    }
}
impl fmt::Display for Triple {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

// ------------- Kind -------------
pub const BASE_CAPABILITY: &str = "Thing";

/// The shape of an entity: a set of capability tags.
///
/// Any combination of ontology types is just another tag set, so a thing
/// that is both a `Participant` and a `State` needs no generated type.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Kind {
    tags: BTreeSet<Arc<str>>,
}

impl Kind {
    pub fn generic() -> Self {
        let mut tags = BTreeSet::new();
        tags.insert(Arc::from(BASE_CAPABILITY));
        Self { tags }
    }
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kind = Self::generic();
        for tag in tags {
            kind.tags.insert(Arc::from(tag.as_ref()));
        }
        kind
    }
    pub fn union(&self, other: &Kind) -> Kind {
        Kind {
            tags: self.tags.union(&other.tags).cloned().collect(),
        }
    }
    pub fn has(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
    pub fn is_generic(&self) -> bool {
        self.tags.iter().all(|t| &**t == BASE_CAPABILITY)
    }
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(|t| &**t)
    }
}
impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let tags: Vec<&str> = self.tags().collect();
        write!(f, "{{{}}}", tags.join(", "))
    }
}

// ------------- Thing -------------
/// A typed entity: every fact sharing one subject.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Thing {
    identifier: Identifier,
    kind: Kind,
    facts: BTreeMap<Identifier, BTreeSet<Value>>,
}

impl Thing {
    pub fn new(identifier: Identifier, kind: Kind) -> Self {
        Self {
            identifier,
            kind,
            facts: BTreeMap::new(),
        }
    }
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }
    pub fn kind(&self) -> &Kind {
        &self.kind
    }
    pub fn is_a(&self, tag: &str) -> bool {
        self.kind.has(tag)
    }
    /// Returns false when the value was already present.
    pub fn add_value(&mut self, predicate: Identifier, value: Value) -> bool {
        self.facts.entry(predicate).or_default().insert(value)
    }
    /// Returns false when the value was not present.
    pub fn remove_value(&mut self, predicate: &Identifier, value: &Value) -> bool {
        let Some(values) = self.facts.get_mut(predicate) else {
            return false;
        };
        let removed = values.remove(value);
        if values.is_empty() {
            self.facts.remove(predicate);
        }
        removed
    }
    pub fn has_value(&self, predicate: &Identifier, value: &Value) -> bool {
        self.facts
            .get(predicate)
            .is_some_and(|values| values.contains(value))
    }
    pub fn values(&self, predicate: &Identifier) -> Option<&BTreeSet<Value>> {
        self.facts.get(predicate)
    }
    pub fn predicates(&self) -> impl Iterator<Item = &Identifier> {
        self.facts.keys()
    }
    pub fn types(&self) -> impl Iterator<Item = &Identifier> {
        self.facts
            .iter()
            .filter(|(p, _)| p.as_str() == RDF_TYPE)
            .flat_map(|(_, values)| values.iter().filter_map(Value::as_reference))
    }
    pub fn triples(&self) -> impl Iterator<Item = Triple> + '_ {
        self.facts.iter().flat_map(move |(predicate, values)| {
            values
                .iter()
                .map(move |value| Triple::new(self.identifier.clone(), predicate.clone(), value.clone()))
        })
    }
    /// The number of facts, counting each value separately.
    pub fn len(&self) -> usize {
        self.facts.values().map(BTreeSet::len).sum()
    }
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}
impl fmt::Display for Thing {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.identifier, self.kind)?;
        for (predicate, values) in &self.facts {
            for value in values {
                write!(f, "\n\t{} {}", predicate, value)?;
            }
        }
        Ok(())
    }
}

// ------------- Namespaces -------------
/// Prefix to namespace IRI mapping used by queries and log output.
#[derive(Clone, Debug)]
pub struct Namespaces {
    kept: BiMap<String, String>,
}

impl Namespaces {
    pub fn new() -> Self {
        let mut kept = BiMap::new();
        kept.insert("rdf".to_owned(), RDF.to_owned());
        kept.insert("rdfs".to_owned(), RDFS.to_owned());
        Self { kept }
    }
    // Rebinding a prefix or a namespace drops the previous pair.
    pub fn bind(&mut self, prefix: &str, namespace: &str) {
        self.kept.insert(prefix.to_owned(), namespace.to_owned());
    }
    pub fn namespace(&self, prefix: &str) -> Option<&str> {
        self.kept.get_by_left(prefix).map(String::as_str)
    }
    pub fn expand(&self, prefixed: &str) -> Result<Identifier> {
        let (prefix, local) = prefixed.split_once(':').ok_or_else(|| {
            ThingraphError::parse(format!("'{}' is not a prefixed name", prefixed))
        })?;
        match self.namespace(prefix) {
            Some(namespace) => Identifier::new(namespace, local),
            None => Err(ThingraphError::parse(format!("Unknown prefix '{}'", prefix))),
        }
    }
    pub fn compact(&self, identifier: &Identifier) -> String {
        match self.kept.get_by_right(identifier.namespace()) {
            Some(prefix) => format!("{}:{}", prefix, identifier.local_name()),
            None => identifier.to_string(),
        }
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.kept.iter().map(|(p, n)| (p.as_str(), n.as_str()))
    }
    pub fn len(&self) -> usize {
        self.kept.len()
    }
}
impl Default for Namespaces {
    fn default() -> Self {
        Self::new()
    }
}
