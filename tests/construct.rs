use thingraph::construct::{rdf_type, Identifier, Kind, Namespaces, Thing, Triple, Value, RDF_TYPE};
use thingraph::ErrorKind;

#[test]
fn identity_is_the_full_iri() {
    let split = Identifier::new("http://example.org/data#", "P").expect("iri");
    let joined = Identifier::new("http://example.org/", "data#P").expect("iri");
    let parsed = Identifier::parse("http://example.org/data#P").expect("parse");
    assert_eq!(split, joined);
    assert_eq!(split, parsed);
    assert_eq!(parsed.namespace(), "http://example.org/data#");
    assert_eq!(parsed.local_name(), "P");
    assert_eq!(Identifier::parse("urn:isbn:0345391802").expect("urn").local_name(), "urn:isbn:0345391802");
    assert_eq!(rdf_type().as_str(), RDF_TYPE);
    assert_eq!(parsed.to_string(), "<http://example.org/data#P>");
}

#[test]
fn malformed_iris_are_rejected() {
    for iri in ["", "has space", "<angled>", "quo\"te"] {
        let error = Identifier::parse(iri).expect_err(iri);
        assert_eq!(error.kind(), ErrorKind::Parse);
    }
}

#[test]
fn joined_parts_are_validated_like_parsed_iris() {
    for local in ["has space", "<P>", "quo\"te", "tab\there"] {
        let error = Identifier::new("http://example.org/data#", local).expect_err(local);
        assert_eq!(error.kind(), ErrorKind::Parse);
    }
    let mut namespaces = Namespaces::new();
    namespaces.bind("bad", "http://example.org/with space#");
    assert!(namespaces.expand("bad:P").is_err());

    // every identifier that can be built survives a JSON round trip
    let p = Identifier::new("http://example.org/data#", "P-1_x").expect("iri");
    let json = serde_json::to_string(&p).expect("serialize");
    let restored: Identifier = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(restored, p);
    assert_eq!(restored.local_name(), "P-1_x");
}

#[test]
fn literals_are_quoted_and_escaped() {
    assert_eq!(Value::from(42_i64), Value::literal("42"));
    assert_eq!(Value::literal("say \"hi\"").to_string(), r#""say \"hi\"""#);
    let reference = Value::from(Identifier::new("http://example.org/data#", "P").expect("iri"));
    assert!(reference.as_literal().is_none());
    assert!(reference.as_reference().is_some());
}

#[test]
fn thing_facts_are_sets() {
    let p = Identifier::new("http://example.org/data#", "P").expect("iri");
    let knows = Identifier::new("http://example.org/ontology#", "knows").expect("iri");
    let mut thing = Thing::new(p.clone(), Kind::generic());
    assert!(thing.add_value(knows.clone(), Value::literal("Q")));
    assert!(!thing.add_value(knows.clone(), Value::literal("Q")));
    assert!(thing.add_value(knows.clone(), Value::literal("R")));
    assert_eq!(thing.len(), 2);
    assert!(thing.remove_value(&knows, &Value::literal("Q")));
    assert!(!thing.remove_value(&knows, &Value::literal("Q")));
    assert!(thing.remove_value(&knows, &Value::literal("R")));
    assert!(thing.is_empty());
    assert_eq!(thing.predicates().count(), 0);
    thing.add_value(rdf_type(), Value::literal("not a reference"));
    assert_eq!(thing.types().count(), 0);
    assert_eq!(
        thing.triples().collect::<Vec<_>>(),
        vec![Triple::new(p, rdf_type(), "not a reference")]
    );
}

#[test]
fn kinds_always_carry_the_base_capability() {
    let kind = Kind::with_tags(["Person"]);
    assert!(kind.has("Thing"));
    assert!(!kind.is_generic());
    assert!(Kind::generic().is_generic());
    let union = kind.union(&Kind::with_tags(["State"]));
    assert_eq!(union.tags().collect::<Vec<_>>(), vec!["Person", "State", "Thing"]);
    assert_eq!(union.to_string(), "{Person, State, Thing}");
}

#[test]
fn namespaces_expand_and_compact() {
    let mut namespaces = Namespaces::new();
    namespaces.bind("ont", "http://example.org/ontology#");
    let person = namespaces.expand("ont:Person").expect("expand");
    assert_eq!(person, Identifier::new("http://example.org/ontology#", "Person").expect("iri"));
    assert_eq!(namespaces.compact(&person), "ont:Person");
    assert_eq!(namespaces.compact(&rdf_type()), "rdf:type");
    assert_eq!(
        namespaces.compact(&Identifier::new("http://other.org/", "x").expect("iri")),
        "<http://other.org/x>"
    );
    assert!(namespaces.expand("nope:x").is_err());
    assert!(namespaces.expand("nocolon").is_err());
}
