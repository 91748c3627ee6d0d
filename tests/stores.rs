use std::sync::Arc;

use thingraph::changeset::ChangeSet;
use thingraph::construct::{rdf_type, Identifier, Kind, Thing, Triple, Value};
use thingraph::mapper::EntityMapper;
use thingraph::memory::MemoryStore;
use thingraph::persist::SqliteStore;
use thingraph::registry::{Constructor, TypeRegistry};
use thingraph::store::{ObjectPattern, Store, TransactionMode, TransactionState, TriplePattern};
use thingraph::ErrorKind;

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
        .register(ont("City"), Constructor::new("City"))
        .build();
    Arc::new(EntityMapper::new(Arc::new(registry)))
}

fn seeded<S: Store>(mut store: S) -> S {
    ChangeSet::new()
        .create(data("A"), rdf_type(), ont("Person"))
        .create(data("A"), ont("name"), "Arthur")
        .create(data("A"), ont("livesIn"), data("L"))
        .create(data("F"), rdf_type(), ont("Person"))
        .create(data("F"), ont("name"), "Ford")
        .create(data("L"), rdf_type(), ont("City"))
        .create(data("L"), ont("name"), "london")
        .apply(&mut store)
        .expect("seed");
    store
}

fn subjects(mut things: Vec<Thing>) -> Vec<Identifier> {
    things.sort_by(|a, b| a.identifier().cmp(b.identifier()));
    things.into_iter().map(|t| t.identifier().clone()).collect()
}

fn finds<S: Store>(store: S) {
    let mut store = seeded(store);
    assert_eq!(store.len().expect("len"), 7);

    let found = store
        .find_by_predicate(&ont("livesIn"), &Value::Reference(data("L")))
        .expect("find");
    assert_eq!(subjects(found.clone()), vec![data("A")]);
    // whole things come back, not just the matching fact
    assert_eq!(found[0].len(), 3);

    let named = store.find_by_predicate_only(&ont("name")).expect("find");
    assert_eq!(subjects(named), vec![data("A"), data("F"), data("L")]);

    let london = store
        .find_by_predicate_case_insensitive(&ont("name"), "London")
        .expect("find");
    assert_eq!(subjects(london), vec![data("L")]);
    let exact = store
        .find_by_predicate(&ont("name"), &Value::literal("London"))
        .expect("find");
    assert!(exact.is_empty());

    // a reference never matches a case-insensitive literal lookup
    let pattern = TriplePattern::predicate(ont("livesIn"))
        .with_object(ObjectPattern::LiteralIgnoreCase(data("L").as_str().to_owned()));
    assert!(store.match_triples(&pattern).expect("match").is_empty());

    // case folding goes beyond ASCII
    ChangeSet::new()
        .create(data("Q"), rdf_type(), ont("Person"))
        .create(data("Q"), ont("nick"), "ÅSA")
        .apply(&mut store)
        .expect("create Q");
    let asa = store
        .find_by_predicate_case_insensitive(&ont("nick"), "åsa")
        .expect("find");
    assert_eq!(subjects(asa), vec![data("Q")]);
    let other = store
        .find_by_predicate_case_insensitive(&ont("nick"), "äsa")
        .expect("find");
    assert!(other.is_empty());
}

#[test]
fn finds_in_memory() {
    finds(MemoryStore::new(mapper()));
}

#[test]
fn finds_in_sqlite() {
    finds(SqliteStore::open_in_memory(mapper()).expect("sqlite"));
}

fn transactions<S: Store>(store: S) {
    let mut store = seeded(store);
    assert_eq!(store.transaction_state(), TransactionState::None);
    // idempotent outside a transaction
    store.commit().expect("commit");
    store.abort().expect("abort");

    store.begin(TransactionMode::Write).expect("begin");
    store.begin(TransactionMode::Read).expect("nested begin");
    assert_eq!(store.transaction_state(), TransactionState::Write);
    store
        .insert_triples(&[Triple::new(data("Z"), rdf_type(), ont("Person"))])
        .expect("insert");
    store.abort().expect("abort");
    assert_eq!(store.transaction_state(), TransactionState::None);
    assert!(store.get(&data("Z")).expect("get").is_none());

    store.begin(TransactionMode::Write).expect("begin");
    store
        .insert_triples(&[Triple::new(data("Z"), rdf_type(), ont("Person"))])
        .expect("insert");
    store.commit().expect("commit");
    assert!(store.get(&data("Z")).expect("get").is_some());

    store.begin(TransactionMode::Read).expect("begin read");
    assert_eq!(store.transaction_state(), TransactionState::Read);
    assert_eq!(store.len().expect("len"), 8);
    store.commit().expect("commit read");
}

#[test]
fn transactions_in_memory() {
    transactions(MemoryStore::new(mapper()));
}

#[test]
fn transactions_in_sqlite() {
    transactions(SqliteStore::open_in_memory(mapper()).expect("sqlite"));
}

fn untyped_reads_fail<S: Store>(mut store: S) {
    store
        .insert_triples(&[Triple::new(data("U"), ont("name"), "x")])
        .expect("insert");
    let error = store.get(&data("U")).expect_err("untyped");
    assert_eq!(error.kind(), ErrorKind::UntypedEntity);
    let thing = store.get_for_update(&data("U")).expect("lenient").expect("thing");
    assert!(thing.kind().is_generic());
    let error = store.find_by_predicate_only(&ont("name")).expect_err("untyped");
    assert_eq!(error.kind(), ErrorKind::UntypedEntity);
}

#[test]
fn untyped_reads_fail_in_memory() {
    untyped_reads_fail(MemoryStore::new(mapper()));
}

#[test]
fn untyped_reads_fail_in_sqlite() {
    untyped_reads_fail(SqliteStore::open_in_memory(mapper()).expect("sqlite"));
}

fn update_replaces_the_subject<S: Store>(store: S) {
    let mut store = seeded(store);
    let mut ford = Thing::new(data("F"), Kind::generic());
    ford.add_value(rdf_type(), Value::Reference(ont("Person")));
    ford.add_value(ont("name"), Value::literal("Ford Prefect"));
    store.update(&ford).expect("update");
    let read = store.get(&data("F")).expect("get").expect("thing");
    assert!(read.has_value(&ont("name"), &Value::literal("Ford Prefect")));
    assert!(!read.has_value(&ont("name"), &Value::literal("Ford")));
    store.delete(&read).expect("delete");
    assert!(store.get(&data("F")).expect("get").is_none());
    assert_eq!(store.len().expect("len"), 5);
}

#[test]
fn update_replaces_the_subject_in_memory() {
    update_replaces_the_subject(MemoryStore::new(mapper()));
}

#[test]
fn update_replaces_the_subject_in_sqlite() {
    update_replaces_the_subject(SqliteStore::open_in_memory(mapper()).expect("sqlite"));
}

#[test]
fn sqlite_file_survives_reopening() {
    let path = std::env::temp_dir().join(format!("thingraph_test_{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    {
        let store = SqliteStore::open(&path, mapper()).expect("open");
        seeded(store);
    }
    let store = SqliteStore::open(&path, mapper()).expect("reopen");
    assert_eq!(store.len().expect("len"), 7);
    let arthur = store.get(&data("A")).expect("get").expect("thing");
    assert!(arthur.has_value(&ont("livesIn"), &Value::Reference(data("L"))));
    drop(store);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn literal_and_reference_with_same_text_are_distinct() {
    let mut store = SqliteStore::open_in_memory(mapper()).expect("sqlite");
    let text = data("L").as_str().to_owned();
    store
        .insert_triples(&[
            Triple::new(data("A"), ont("seeAlso"), data("L")),
            Triple::new(data("A"), ont("seeAlso"), text.clone()),
        ])
        .expect("insert");
    assert_eq!(store.len().expect("len"), 2);
    let literal = TriplePattern::subject(data("A"))
        .with_object(ObjectPattern::Exact(Value::literal(text)));
    let matched = store.match_triples(&literal).expect("match");
    assert_eq!(matched.len(), 1);
    assert!(matched[0].object().as_literal().is_some());
}
