//! Database module: record shapes and the mapping engines that persist them.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows and their column mapping
//! - `schema.rs`: column declarations, DDL generation and constraint checks
//! - `sqlite.rs`: the sqlx/SQLite engine
//! - `memory.rs`: an in-process engine with the same contract, used as a test double

pub mod memory;
pub mod models;
pub mod schema;
pub mod sqlite;

use sqlx::Error as SqlxError;
use std::future::Future;
use thiserror::Error as ThisError;

pub use memory::MemoryEngine;
pub use models::{Session, User};
pub use schema::{FieldKind, FieldSpec};
pub use sqlite::{SqliteEngine, SqlitePool};

/// A single column value as it crosses the engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    Integer(i64),
    Text(String),
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

#[derive(Debug, ThisError)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] SqlxError),

    #[error("{table}.{field} is required")]
    Required {
        table: &'static str,
        field: &'static str,
    },

    #[error("{table}.{field} must be {min}..={max} characters long, got {len}")]
    Length {
        table: &'static str,
        field: &'static str,
        min: usize,
        max: usize,
        len: usize,
    },

    #[error("{table}.{field} must be unique")]
    Unique { table: &'static str, field: String },

    #[error("unknown column {field} on {table}")]
    UnknownField { table: &'static str, field: String },

    #[error("table {0} does not exist")]
    NoSuchTable(&'static str),

    #[error("no {table} row with id {id}")]
    MissingRow { table: &'static str, id: i64 },

    #[error("unexpected value for {table}.{field}")]
    Decode {
        table: &'static str,
        field: &'static str,
    },
}

/// A record shape the engines know how to store.
///
/// `values` and `from_values` work on the non-id columns in `FIELDS` order.
pub trait Record: Default + Clone + Send + Sync + 'static {
    const TABLE: &'static str;
    const FIELDS: &'static [FieldSpec];

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);
    fn values(&self) -> Vec<Value>;
    fn from_values(id: i64, values: Vec<Value>) -> Result<Self, EngineError>;

    fn is_transient(&self) -> bool {
        self.id() == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Equality filters, one ordering, limit and offset for `RecordEngine::find`.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub filters: Vec<(&'static str, Value)>,
    pub order: Option<(&'static str, Direction)>,
    pub limit: Option<u32>,
    pub offset: u32,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: &'static str, value: impl Into<Value>) -> Self {
        self.filters.push((field, value.into()));
        self
    }

    pub fn order_by(mut self, field: &'static str, direction: Direction) -> Self {
        self.order = Some((field, direction));
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    /// The lookup every accessor uses: match one field, lowest id first, one row.
    pub fn first_by(field: &'static str, value: impl Into<Value>) -> Self {
        Self::new()
            .filter(field, value)
            .order_by("id", Direction::Asc)
            .limit(1)
    }

    fn check_columns<R: Record>(&self) -> Result<(), EngineError> {
        let names = self
            .filters
            .iter()
            .map(|(f, _)| *f)
            .chain(self.order.map(|(f, _)| f));
        for name in names {
            if !schema::is_known_column::<R>(name) {
                return Err(EngineError::UnknownField {
                    table: R::TABLE,
                    field: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Translates records to rows and back.
pub trait RecordEngine: Clone + Send + Sync {
    /// Create the table (and lookup indexes) for `R`.
    fn create_schema<R: Record>(&self) -> impl Future<Output = Result<(), EngineError>> + Send;

    /// Insert when `record` is transient and assign its id, otherwise update by id.
    fn save<R: Record>(
        &self,
        record: &mut R,
    ) -> impl Future<Output = Result<(), EngineError>> + Send;

    fn find<R: Record>(
        &self,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<R>, EngineError>> + Send;
}

/// Pulls typed values off a row in column order.
pub(crate) struct Columns<R> {
    values: std::vec::IntoIter<Value>,
    fields: std::slice::Iter<'static, FieldSpec>,
    _shape: std::marker::PhantomData<R>,
}

impl<R: Record> Columns<R> {
    pub(crate) fn new(values: Vec<Value>) -> Self {
        Self {
            values: values.into_iter(),
            fields: R::FIELDS.iter(),
            _shape: std::marker::PhantomData,
        }
    }

    fn take(&mut self) -> (&'static str, Option<Value>) {
        let field = self.fields.next().map(|f| f.name).unwrap_or("<extra>");
        (field, self.values.next())
    }

    pub(crate) fn int(&mut self) -> Result<i64, EngineError> {
        match self.take() {
            (_, Some(Value::Integer(i))) => Ok(i),
            (field, _) => Err(EngineError::Decode {
                table: R::TABLE,
                field,
            }),
        }
    }

    pub(crate) fn text(&mut self) -> Result<String, EngineError> {
        match self.take() {
            (_, Some(Value::Text(s))) => Ok(s),
            (field, _) => Err(EngineError::Decode {
                table: R::TABLE,
                field,
            }),
        }
    }
}
