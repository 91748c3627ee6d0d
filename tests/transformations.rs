use std::sync::Arc;

use thingraph::changeset::ChangeSet;
use thingraph::construct::{rdf_type, Identifier, Triple, Value};
use thingraph::mapper::EntityMapper;
use thingraph::memory::MemoryStore;
use thingraph::persist::SqliteStore;
use thingraph::registry::{Constructor, TypeRegistry};
use thingraph::store::{Store, TransactionState, TriplePattern};
use thingraph::transformation::Transformation;
use thingraph::{ErrorKind, ThingraphError};

const ONT: &str = "http://example.org/ontology#";
const DATA: &str = "http://example.org/data#";

fn ont(local: &str) -> Identifier {
    Identifier::new(ONT, local).expect("iri")
}
fn data(local: &str) -> Identifier {
    Identifier::new(DATA, local).expect("iri")
}

fn mapper() -> Arc<EntityMapper> {
    let registry = TypeRegistry::builder()
        .ontology_namespace(ONT)
        .register(ont("Person"), Constructor::new("Person"))
        .register(ont("Employee"), Constructor::new("Employee"))
        .build();
    Arc::new(EntityMapper::new(Arc::new(registry)))
}

fn snapshot<S: Store>(store: &S) -> Vec<Triple> {
    store.match_triples(&TriplePattern::any()).expect("snapshot")
}

#[test]
fn invert_reverses_the_order() {
    let c1 = ChangeSet::new().create(data("P"), rdf_type(), ont("Person"));
    let c2 = ChangeSet::new().create(data("P"), ont("name"), "Ford");
    let transformation: Transformation = vec![c1.clone(), c2.clone()].into_iter().collect();
    let inverse = transformation.invert();
    assert_eq!(inverse.change_sets(), &[c2.invert(), c1.invert()]);
    assert_eq!(inverse.invert(), transformation);
}

#[test]
fn add_appends() {
    let mut transformation = Transformation::new();
    assert!(transformation.is_empty());
    transformation.add(ChangeSet::new().with_label("first"));
    transformation.add(ChangeSet::new().with_label("second"));
    assert_eq!(transformation.len(), 2);
    assert_eq!(transformation.change_sets()[1].label(), Some("second"));
}

fn create_read_and_undo<S: Store>(mut store: S) {
    let p = data("P");
    let create_type = ChangeSet::new().create(p.clone(), rdf_type(), ont("Person"));
    let create_name = ChangeSet::new().create(p.clone(), ont("name"), "Trillian");
    let mut transformation = Transformation::new();
    transformation.add(create_type.clone());
    transformation.add(create_name.clone());
    transformation.apply(&mut store).expect("apply");

    let thing = store.get(&p).expect("get").expect("P exists");
    assert!(thing.is_a("Person"));
    assert!(thing.has_value(&ont("name"), &Value::literal("Trillian")));
    assert!(thing.has_value(&rdf_type(), &Value::Reference(ont("Person"))));
    assert_eq!(thing.len(), 2);

    // undo one change set at a time, last first
    let mut undo = Transformation::new();
    undo.add(create_name.invert());
    undo.add(create_type.invert());
    undo.apply(&mut store).expect("undo");
    assert!(store.get(&p).expect("get").is_none());
    assert!(store.is_empty().expect("is_empty"));

    // and again through the whole-batch inverse
    transformation.apply(&mut store).expect("reapply");
    transformation.invert().apply(&mut store).expect("invert");
    assert!(store.get(&p).expect("get").is_none());
}

#[test]
fn create_read_and_undo_in_memory() {
    create_read_and_undo(MemoryStore::new(mapper()));
}

#[test]
fn create_read_and_undo_in_sqlite() {
    create_read_and_undo(SqliteStore::open_in_memory(mapper()).expect("sqlite"));
}

fn failure_reports_the_change_set<S: Store>(mut store: S) {
    let mut transformation = Transformation::new();
    transformation.add(ChangeSet::new().create(data("P"), rdf_type(), ont("Person")));
    transformation.add(ChangeSet::new().create(data("P"), ont("name"), "Marvin"));
    transformation.add(ChangeSet::new().delete(data("P"), ont("name"), "Eddie"));
    let error = transformation.apply(&mut store).expect_err("third change set fails");
    match &error {
        ThingraphError::ChangeSetFailed { index, .. } => assert_eq!(*index, 2),
        other => panic!("unexpected error {other}"),
    }
    assert_eq!(error.kind(), ErrorKind::TripleNotFound);
    // nothing from the first two change sets survives
    assert!(snapshot(&store).is_empty());
    assert_eq!(store.transaction_state(), TransactionState::None);
}

#[test]
fn failure_reports_the_change_set_in_memory() {
    failure_reports_the_change_set(MemoryStore::new(mapper()));
}

#[test]
fn failure_reports_the_change_set_in_sqlite() {
    failure_reports_the_change_set(SqliteStore::open_in_memory(mapper()).expect("sqlite"));
}

#[test]
fn multiply_typed_thing_round_trips() {
    let mut store = MemoryStore::new(mapper());
    let t = data("T");
    let hire: Transformation = [
        ChangeSet::new()
            .create(t.clone(), rdf_type(), ont("Person"))
            .create(t.clone(), ont("name"), "Ann"),
        ChangeSet::new().create(t.clone(), rdf_type(), ont("Employee")),
    ]
    .into_iter()
    .collect();
    hire.apply(&mut store).expect("hire");
    let ann = store.get(&t).expect("get").expect("T exists");
    assert!(ann.is_a("Person"));
    assert!(ann.is_a("Employee"));

    hire.invert().apply(&mut store).expect("undo hire");
    assert!(store.is_empty().expect("is_empty"));
}
