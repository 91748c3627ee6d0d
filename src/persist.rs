// used for persistence
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Type, ValueRef};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, params, params_from_iter};
use rusqlite::types::Value as SqlValue;

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::construct::{Identifier, Thing, Triple, Value};
use crate::error::{Result, ThingraphError};
use crate::mapper::EntityMapper;
use crate::settings::StoreSettings;
use crate::store::{ObjectPattern, Store, TransactionMode, TransactionState, TriplePattern};

const REFERENCE: i64 = 0;
const LITERAL: i64 = 1;

impl ToSql for Identifier {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}
impl FromSql for Identifier {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Identifier::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

fn object_columns(value: &Value) -> (i64, &str) {
    match value {
        Value::Reference(identifier) => (REFERENCE, identifier.as_str()),
        Value::Literal(lexical) => (LITERAL, lexical.as_str()),
    }
}

fn triple_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Triple> {
    let subject: Identifier = row.get(0)?;
    let predicate: Identifier = row.get(1)?;
    let kind: i64 = row.get(2)?;
    let object: String = row.get(3)?;
    let object = match kind {
        REFERENCE => Value::Reference(
            Identifier::parse(&object)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(e)))?,
        ),
        LITERAL => Value::Literal(object),
        other => return Err(rusqlite::Error::IntegralValueOutOfRange(2, other)),
    };
    Ok(Triple::new(subject, predicate, object))
}

// ------------- Persistence -------------
/// A store persisting its triples in SQLite, one row per triple.
pub struct SqliteStore {
    db: Connection,
    mapper: Arc<EntityMapper>,
    state: TransactionState,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>, mapper: Arc<EntityMapper>) -> Result<Self> {
        let connection = Connection::open(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "opened sqlite store");
        Self::from_connection(connection, mapper)
    }
    pub fn open_in_memory(mapper: Arc<EntityMapper>) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, mapper)
    }
    pub fn from_connection(connection: Connection, mapper: Arc<EntityMapper>) -> Result<Self> {
        // Unicode case folding; the builtin lower() only folds ASCII
        connection.create_scalar_function(
            "fold_case",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let lexical: String = ctx.get(0)?;
                Ok(lexical.to_lowercase())
            },
        )?;
        // The "STRICT" keyword introduced in 3.37.0 breaks JDBC connections, which makes
        // debugging using an external tool like DBeaver impossible
        connection.execute_batch(
            "
            create table if not exists Triple (
                Subject text not null,
                Predicate text not null,
                ObjectKind integer not null,
                Object text not null,
                constraint unique_Triple primary key (
                    Subject,
                    Predicate,
                    ObjectKind,
                    Object
                )
            );-- STRICT;
            create index if not exists Triple_by_Predicate_Object on Triple (
                Predicate,
                Object
            );
            ",
        )?;
        Ok(Self {
            db: connection,
            mapper,
            state: TransactionState::None,
        })
    }
    pub fn from_settings(settings: &StoreSettings, mapper: Arc<EntityMapper>) -> Result<Self> {
        match &settings.path {
            Some(path) => Self::open(path, mapper),
            None => Self::open_in_memory(mapper),
        }
    }
    pub fn connection(&self) -> &Connection {
        &self.db
    }
}

impl Store for SqliteStore {
    fn begin(&mut self, mode: TransactionMode) -> Result<()> {
        if self.state == TransactionState::None {
            match mode {
                TransactionMode::Read => self.db.execute_batch("begin deferred")?,
                TransactionMode::Write => self.db.execute_batch("begin immediate")?,
            }
            self.state = mode.into();
            debug!(?mode, "transaction begun");
        }
        Ok(())
    }
    fn commit(&mut self) -> Result<()> {
        if self.state != TransactionState::None {
            self.db.execute_batch("commit")?;
            self.state = TransactionState::None;
            debug!("transaction committed");
        }
        Ok(())
    }
    fn abort(&mut self) -> Result<()> {
        if self.state != TransactionState::None {
            // a failed rollback still ends the transaction as far as sqlite is concerned
            self.state = TransactionState::None;
            self.db.execute_batch("rollback")?;
            debug!("transaction aborted");
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
        let mut clauses = Vec::new();
        let mut bound: Vec<SqlValue> = Vec::new();
        if let Some(subject) = &pattern.subject {
            clauses.push("Subject = ?");
            bound.push(SqlValue::Text(subject.as_str().to_owned()));
        }
        if let Some(predicate) = &pattern.predicate {
            clauses.push("Predicate = ?");
            bound.push(SqlValue::Text(predicate.as_str().to_owned()));
        }
        match &pattern.object {
            ObjectPattern::Any => (),
            ObjectPattern::Exact(value) => {
                let (kind, object) = object_columns(value);
                clauses.push("ObjectKind = ? and Object = ?");
                bound.push(SqlValue::Integer(kind));
                bound.push(SqlValue::Text(object.to_owned()));
            }
            ObjectPattern::LiteralIgnoreCase(lexical) => {
                clauses.push("ObjectKind = ? and fold_case(Object) = fold_case(?)");
                bound.push(SqlValue::Integer(LITERAL));
                bound.push(SqlValue::Text(lexical.to_owned()));
            }
        }
        let mut sql = String::from("select Subject, Predicate, ObjectKind, Object from Triple");
        if !clauses.is_empty() {
            sql.push_str(" where ");
            sql.push_str(&clauses.join(" and "));
        }
        sql.push_str(" order by Subject, Predicate, ObjectKind, Object");
        trace!(%sql, %pattern, "matching triples");
        let mut statement = self.db.prepare_cached(&sql)?;
        let rows = statement.query_map(params_from_iter(bound.iter()), triple_from_row)?;
        let mut matched = Vec::new();
        for row in rows {
            matched.push(row?);
        }
        Ok(matched)
    }
    fn insert_triples(&mut self, triples: &[Triple]) -> Result<()> {
        let mut statement = self.db.prepare_cached(
            "
            insert or ignore into Triple (
                Subject,
                Predicate,
                ObjectKind,
                Object
            ) values (?, ?, ?, ?)
            ",
        )?;
        for triple in triples {
            let (kind, object) = object_columns(triple.object());
            statement.execute(params![triple.subject(), triple.predicate(), kind, object])?;
        }
        Ok(())
    }
    fn remove_triples(&mut self, triples: &[Triple]) -> Result<()> {
        let mut statement = self.db.prepare_cached(
            "
            delete from Triple
                where Subject = ?
                and Predicate = ?
                and ObjectKind = ?
                and Object = ?
            ",
        )?;
        for triple in triples {
            let (kind, object) = object_columns(triple.object());
            statement.execute(params![triple.subject(), triple.predicate(), kind, object])?;
        }
        Ok(())
    }
    fn len(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .query_row("select count(*) from Triple", [], |r| r.get(0))?;
        usize::try_from(count)
            .map_err(|e| ThingraphError::Store(format!("Triple count {} out of range: {}", count, e)))
    }
    fn update(&mut self, thing: &Thing) -> Result<()> {
        self.db
            .execute("delete from Triple where Subject = ?", params![thing.identifier()])?;
        self.create(thing)
    }
}
