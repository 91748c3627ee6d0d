//! The type registry: a data-driven table from ontology type identifiers to
//! entity constructors.
//!
//! The table is loaded once at startup (see [`TypeRegistry::from_json`] and
//! [`TypeRegistry::from_path`]) and then shared immutably with the
//! [`crate::mapper::EntityMapper`]. Growing the ontology means growing the
//! table; the mapping algorithm never changes.
//!
//! ```text
//! {
//!   "namespaces": ["http://example.org/ontology#"],
//!   "prefixes": { "ont": "http://example.org/ontology#" },
//!   "types": [
//!     { "iri": "http://example.org/ontology#Person", "tag": "Person", "capabilities": ["Agent"] }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::construct::{Identifier, Kind, Namespaces, OtherHasher};
use crate::error::Result;

// ------------- Constructor -------------
/// Builds the shape of a thing carrying exactly one ontology type.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Constructor {
    tag: String,
    capabilities: Vec<String>,
}

impl Constructor {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            capabilities: Vec::new(),
        }
    }
    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.capabilities.push(capability.into());
        self
    }
    pub fn tag(&self) -> &str {
        &self.tag
    }
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }
    pub fn construct(&self) -> Kind {
        Kind::with_tags(std::iter::once(&self.tag).chain(self.capabilities.iter()))
    }
}

// ------------- Composition -------------
/// Extension point for shaping multiply-typed things.
///
/// Providers are asked in registration order; the first one answering
/// `Some` decides the kind. Returning `None` defers to the next provider
/// and finally to the built-in union of the recognized types.
pub trait CompositionProvider: Send + Sync {
    fn compose(&self, types: &BTreeSet<Identifier>, registry: &TypeRegistry) -> Option<Kind>;
}

// ------------- Table format -------------
#[derive(Deserialize, Debug, Default)]
struct TypeTable {
    #[serde(default)]
    namespaces: Vec<String>,
    #[serde(default)]
    prefixes: BTreeMap<String, String>,
    #[serde(default)]
    types: Vec<TypeEntry>,
}

#[derive(Deserialize, Debug)]
struct TypeEntry {
    iri: String,
    tag: String,
    #[serde(default)]
    capabilities: Vec<String>,
}

// ------------- TypeRegistry -------------
pub struct TypeRegistry {
    ontology_namespaces: Vec<String>,
    constructors: HashMap<Identifier, Constructor, OtherHasher>,
    providers: Vec<Box<dyn CompositionProvider>>,
    namespaces: Namespaces,
}

impl TypeRegistry {
    pub fn builder() -> TypeRegistryBuilder {
        TypeRegistryBuilder {
            registry: TypeRegistry::empty(),
        }
    }
    pub fn empty() -> Self {
        Self {
            ontology_namespaces: Vec::new(),
            constructors: HashMap::default(),
            providers: Vec::new(),
            namespaces: Namespaces::new(),
        }
    }
    pub fn from_json(json: &str) -> Result<Self> {
        let table: TypeTable = serde_json::from_str(json)?;
        let mut builder = Self::builder();
        for namespace in &table.namespaces {
            builder = builder.ontology_namespace(namespace);
        }
        for (prefix, namespace) in &table.prefixes {
            builder = builder.prefix(prefix, namespace);
        }
        for entry in table.types {
            let identifier = Identifier::parse(&entry.iri)?;
            let mut constructor = Constructor::new(entry.tag);
            for capability in entry.capabilities {
                constructor = constructor.with_capability(capability);
            }
            builder = builder.register(identifier, constructor);
        }
        let registry = builder.build();
        debug!(types = registry.len(), namespaces = registry.ontology_namespaces.len(), "type registry loaded");
        Ok(registry)
    }
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&json)
    }
    pub fn is_ontology_type(&self, identifier: &Identifier) -> bool {
        self.ontology_namespaces
            .iter()
            .any(|namespace| identifier.in_namespace(namespace))
    }
    pub fn single_type_constructor(&self, identifier: &Identifier) -> Option<&Constructor> {
        self.constructors.get(identifier)
    }
    /// Never fails: an unknown combination falls back to the generic kind.
    pub fn compose_multi_type(&self, types: &BTreeSet<Identifier>) -> Kind {
        for provider in &self.providers {
            if let Some(kind) = provider.compose(types, self) {
                return kind;
            }
        }
        types
            .iter()
            .filter_map(|t| self.single_type_constructor(t))
            .fold(Kind::generic(), |kind, constructor| kind.union(&constructor.construct()))
    }
    pub fn namespaces(&self) -> &Namespaces {
        &self.namespaces
    }
    pub fn len(&self) -> usize {
        self.constructors.len()
    }
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}
impl Default for TypeRegistry {
    fn default() -> Self {
        Self::empty()
    }
}
impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("ontology_namespaces", &self.ontology_namespaces)
            .field("types", &self.constructors.len())
            .field("providers", &self.providers.len())
            .finish()
    }
}

pub struct TypeRegistryBuilder {
    registry: TypeRegistry,
}

impl TypeRegistryBuilder {
    pub fn ontology_namespace(mut self, namespace: &str) -> Self {
        if !self.registry.ontology_namespaces.iter().any(|n| n == namespace) {
            self.registry.ontology_namespaces.push(namespace.to_owned());
        }
        self
    }
    pub fn prefix(mut self, prefix: &str, namespace: &str) -> Self {
        self.registry.namespaces.bind(prefix, namespace);
        self
    }
    pub fn register(mut self, identifier: Identifier, constructor: Constructor) -> Self {
        if let Some(previous) = self.registry.constructors.insert(identifier.clone(), constructor) {
            warn!(%identifier, previous = previous.tag(), "type registered twice, keeping the later entry");
        }
        self
    }
    pub fn provider(mut self, provider: impl CompositionProvider + 'static) -> Self {
        self.registry.providers.push(Box::new(provider));
        self
    }
    pub fn build(self) -> TypeRegistry {
        self.registry
    }
}
