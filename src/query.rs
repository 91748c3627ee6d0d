//! Graph-pattern construct queries.
//!
//! A query has a template and a list of patterns:
//!
//! ```text
//! PREFIX ont: <http://example.org/ontology#>
//! CONSTRUCT { ?s ?p ?o } WHERE { ?s a ont:Person . ?s ?p ?o }
//! ```
//!
//! Patterns are joined left to right against [`Store::match_triples`]. Each
//! solution instantiates the template; solutions that leave a template
//! variable unbound, or would put a literal in subject or predicate
//! position, produce nothing. Grammar details live in `query.pest`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use pest::Parser;
use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest_derive::Parser;
use tracing::debug;

use crate::construct::{rdf_type, Identifier, Namespaces, OtherHasher, Triple, Value};
use crate::error::{Result, ThingraphError};
use crate::store::{ObjectPattern, Store, TriplePattern};

#[derive(Parser)]
#[grammar = "query.pest"]
struct QueryParser;

type Bindings = HashMap<String, Value, OtherHasher>;

// ------------- Term -------------
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Term {
    Variable(String),
    Constant(Value),
}

impl Term {
    pub fn var(name: &str) -> Self {
        Self::Variable(name.trim_start_matches('?').to_owned())
    }
    pub fn iri(identifier: Identifier) -> Self {
        Self::Constant(Value::Reference(identifier))
    }
    pub fn literal(lexical: impl Into<String>) -> Self {
        Self::Constant(Value::Literal(lexical.into()))
    }
    fn resolve<'b>(&'b self, bindings: &'b Bindings) -> Option<&'b Value> {
        match self {
            Self::Variable(name) => bindings.get(name),
            Self::Constant(value) => Some(value),
        }
    }
}
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Variable(name) => write!(f, "?{}", name),
            Self::Constant(value) => write!(f, "{}", value),
        }
    }
}

// ------------- Pattern -------------
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Pattern {
    subject: Term,
    predicate: Term,
    object: Term,
}

impl Pattern {
    pub fn new(subject: Term, predicate: Term, object: Term) -> Result<Self> {
        for (position, term) in [("subject", &subject), ("predicate", &predicate)] {
            if let Term::Constant(Value::Literal(lexical)) = term {
                return Err(ThingraphError::parse(format!(
                    "Literal \"{}\" is not allowed in {} position",
                    lexical, position
                )));
            }
        }
        Ok(Self { subject, predicate, object })
    }
    pub fn terms(&self) -> [&Term; 3] {
        [&self.subject, &self.predicate, &self.object]
    }
    /// The store lookup for this pattern under the given bindings, or
    /// `None` when a bound literal makes a match impossible.
    fn lookup(&self, bindings: &Bindings) -> Option<TriplePattern> {
        let subject = match self.subject.resolve(bindings) {
            Some(Value::Reference(identifier)) => Some(identifier.clone()),
            Some(Value::Literal(_)) => return None,
            None => None,
        };
        let predicate = match self.predicate.resolve(bindings) {
            Some(Value::Reference(identifier)) => Some(identifier.clone()),
            Some(Value::Literal(_)) => return None,
            None => None,
        };
        let object = match self.object.resolve(bindings) {
            Some(value) => ObjectPattern::Exact(value.clone()),
            None => ObjectPattern::Any,
        };
        Some(TriplePattern { subject, predicate, object })
    }
    fn unify(&self, triple: &Triple, bindings: &Bindings) -> Option<Bindings> {
        let mut extended = bindings.clone();
        let positions = [
            (&self.subject, Value::Reference(triple.subject().clone())),
            (&self.predicate, Value::Reference(triple.predicate().clone())),
            (&self.object, triple.object().clone()),
        ];
        for (term, value) in positions {
            match term {
                Term::Variable(name) => match extended.get(name) {
                    Some(bound) if *bound != value => return None,
                    Some(_) => (),
                    None => {
                        extended.insert(name.clone(), value);
                    }
                },
                Term::Constant(constant) if *constant != value => return None,
                Term::Constant(_) => (),
            }
        }
        Some(extended)
    }
    fn instantiate(&self, bindings: &Bindings) -> Option<Triple> {
        let subject = self.subject.resolve(bindings)?.as_reference()?.clone();
        let predicate = self.predicate.resolve(bindings)?.as_reference()?.clone();
        let object = self.object.resolve(bindings)?.clone();
        Some(Triple::new(subject, predicate, object))
    }
}
impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

// ------------- ConstructQuery -------------
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ConstructQuery {
    template: Vec<Pattern>,
    patterns: Vec<Pattern>,
}

impl ConstructQuery {
    pub fn new(template: Vec<Pattern>, patterns: Vec<Pattern>) -> Self {
        Self { template, patterns }
    }
    /// Parses a query; prefixed names resolve against the query's own
    /// `PREFIX` declarations first and `namespaces` second.
    pub fn parse(text: &str, namespaces: &Namespaces) -> Result<Self> {
        let mut pairs = QueryParser::parse(Rule::query, text).map_err(|e| {
            let (line, col) = match e.line_col {
                LineColLocation::Pos((l, c)) | LineColLocation::Span((l, c), _) => (l, c),
            };
            ThingraphError::Parse {
                message: e.to_string(),
                line: Some(line),
                col: Some(col),
            }
        })?;
        let mut namespaces = namespaces.clone();
        let mut template = Vec::new();
        let mut patterns = Vec::new();
        let Some(query) = pairs.next() else {
            return Err(ThingraphError::parse("Empty query"));
        };
        for pair in query.into_inner() {
            match pair.as_rule() {
                Rule::prefix_decl => {
                    let mut inner = pair.into_inner();
                    let (Some(prefix), Some(iri)) = (inner.next(), inner.next()) else {
                        return Err(ThingraphError::parse("Incomplete prefix declaration"));
                    };
                    namespaces.bind(prefix.as_str().trim_end_matches(':'), strip(iri.as_str()));
                }
                Rule::construct_clause => {
                    for pattern in pair.into_inner() {
                        template.push(build_pattern(pattern, &namespaces)?);
                    }
                }
                Rule::where_clause => {
                    for pattern in pair.into_inner() {
                        patterns.push(build_pattern(pattern, &namespaces)?);
                    }
                }
                _ => (),
            }
        }
        debug!(template = template.len(), patterns = patterns.len(), "construct query parsed");
        Ok(Self { template, patterns })
    }
    pub fn template(&self) -> &[Pattern] {
        &self.template
    }
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }
    /// Evaluates the query, returning the distinct constructed triples.
    pub fn evaluate<S: Store + ?Sized>(&self, store: &S) -> Result<Vec<Triple>> {
        let mut solutions: Vec<Bindings> = vec![Bindings::default()];
        for pattern in &self.patterns {
            let mut extended = Vec::new();
            for bindings in &solutions {
                let Some(lookup) = pattern.lookup(bindings) else {
                    continue;
                };
                for triple in store.match_triples(&lookup)? {
                    if let Some(solution) = pattern.unify(&triple, bindings) {
                        extended.push(solution);
                    }
                }
            }
            solutions = extended;
            if solutions.is_empty() {
                break;
            }
        }
        let mut constructed = BTreeSet::new();
        for bindings in &solutions {
            for pattern in &self.template {
                if let Some(triple) = pattern.instantiate(bindings) {
                    constructed.insert(triple);
                }
            }
        }
        debug!(solutions = solutions.len(), triples = constructed.len(), "construct query evaluated");
        Ok(constructed.into_iter().collect())
    }
}
impl fmt::Display for ConstructQuery {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let join = |patterns: &[Pattern]| {
            patterns
                .iter()
                .map(Pattern::to_string)
                .collect::<Vec<_>>()
                .join(" . ")
        };
        write!(
            f,
            "CONSTRUCT {{ {} }} WHERE {{ {} }}",
            join(self.template.as_slice()),
            join(self.patterns.as_slice())
        )
    }
}

// ------------- Parse tree -------------
fn strip(delimited: &str) -> &str {
    &delimited[1..delimited.len() - 1]
}

fn unescape(escaped: &str) -> String {
    let mut unescaped = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            unescaped.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => unescaped.push('\n'),
            Some('t') => unescaped.push('\t'),
            Some('r') => unescaped.push('\r'),
            Some(other) => unescaped.push(other),
            None => unescaped.push('\\'),
        }
    }
    unescaped
}

fn build_term(pair: Pair<'_, Rule>, namespaces: &Namespaces) -> Result<Term> {
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::variable => Ok(Term::var(text)),
        Rule::iri => Ok(Term::iri(Identifier::parse(strip(text))?)),
        Rule::prefixed_name => Ok(Term::iri(namespaces.expand(text)?)),
        Rule::literal => Ok(Term::literal(unescape(strip(text)))),
        Rule::integer => Ok(Term::literal(text)),
        Rule::a_keyword => Ok(Term::iri(rdf_type())),
        other => Err(ThingraphError::parse(format!("Unexpected {:?} '{}'", other, text))),
    }
}

fn build_pattern(pair: Pair<'_, Rule>, namespaces: &Namespaces) -> Result<Pattern> {
    let mut inner = pair.into_inner();
    let (Some(subject), Some(predicate), Some(object)) = (inner.next(), inner.next(), inner.next()) else {
        return Err(ThingraphError::parse("Incomplete triple pattern"));
    };
    Pattern::new(
        build_term(subject, namespaces)?,
        build_term(predicate, namespaces)?,
        build_term(object, namespaces)?,
    )
}
