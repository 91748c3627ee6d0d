//! Reconstruction of typed things from flat, unordered triples.
//!
//! Triples are grouped by subject and every group is resolved to a [`Kind`]
//! through the [`TypeRegistry`]:
//! * no `rdf:type` reference at all fails with `UntypedEntity`,
//! * type references outside the ontology namespaces, or a single type the
//!   registry does not know, degrade to the generic kind,
//! * one known ontology type uses its single-type constructor,
//! * several ontology types are composed by the registry.
//!
//! The constructed thing is then populated with every triple of its group,
//! type triples included. Things are never cached; every read rebuilds them.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{trace, warn};

use crate::construct::{Identifier, Kind, Thing, ThingHasher, Triple, Value};
use crate::error::{Result, ThingraphError};
use crate::registry::TypeRegistry;

/// How a subject without any type assertion is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// Untyped subjects fail with `UntypedEntity`. Used by every read.
    Strict,
    /// Untyped subjects become generic things. Used by the write path of
    /// operations, which may pass through states where a subject has
    /// temporarily lost its type triple.
    Lenient,
}

#[derive(Debug)]
pub struct EntityMapper {
    registry: Arc<TypeRegistry>,
}

impl EntityMapper {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
    /// Groups the triples by subject and reconstructs one thing per
    /// subject. The order of the returned things is unspecified.
    pub fn reconstruct<I>(&self, triples: I) -> Result<Vec<Thing>>
    where
        I: IntoIterator<Item = Triple>,
    {
        let mut groups: HashMap<Identifier, Vec<Triple>, ThingHasher> = HashMap::default();
        for triple in triples {
            groups.entry(triple.subject().clone()).or_default().push(triple);
        }
        let mut things = Vec::with_capacity(groups.len());
        for (subject, group) in groups {
            let kind = self.resolve(&subject, &group, Resolution::Strict)?;
            things.push(populate(Thing::new(subject, kind), group));
        }
        Ok(things)
    }
    /// Reconstructs the thing at `subject` from its triples, ignoring any
    /// triple about another subject. Returns `None` when no triple is left.
    pub fn reconstruct_one<I>(
        &self,
        subject: &Identifier,
        triples: I,
        resolution: Resolution,
    ) -> Result<Option<Thing>>
    where
        I: IntoIterator<Item = Triple>,
    {
        let group: Vec<Triple> = triples
            .into_iter()
            .filter(|t| t.subject() == subject)
            .collect();
        if group.is_empty() {
            return Ok(None);
        }
        let kind = self.resolve(subject, &group, resolution)?;
        Ok(Some(populate(Thing::new(subject.clone(), kind), group)))
    }
    fn resolve(&self, subject: &Identifier, group: &[Triple], resolution: Resolution) -> Result<Kind> {
        let mut typed = false;
        let mut types = BTreeSet::new();
        for triple in group.iter().filter(|t| t.is_type_assertion()) {
            match triple.object() {
                Value::Reference(object) => {
                    typed = true;
                    if self.registry.is_ontology_type(object) {
                        types.insert(object.clone());
                    }
                }
                Value::Literal(_) => (),
            }
        }
        if !typed {
            return match resolution {
                Resolution::Strict => Err(ThingraphError::UntypedEntity {
                    subject: subject.clone(),
                }),
                Resolution::Lenient => {
                    trace!(%subject, "untyped subject read leniently");
                    Ok(Kind::generic())
                }
            };
        }
        let kind = match types.len() {
            0 => {
                warn!(%subject, "no ontology type among the type assertions, using the generic kind");
                Kind::generic()
            }
            1 => match types.first().and_then(|t| self.registry.single_type_constructor(t)) {
                Some(constructor) => constructor.construct(),
                None => {
                    warn!(%subject, types = ?types, "type is not registered, using the generic kind");
                    Kind::generic()
                }
            },
            _ => self.registry.compose_multi_type(&types),
        };
        trace!(%subject, %kind, "kind resolved");
        Ok(kind)
    }
}

fn populate(mut thing: Thing, group: Vec<Triple>) -> Thing {
    for triple in group {
        let (_, predicate, object) = triple.into_parts();
        thing.add_value(predicate, object);
    }
    thing
}
