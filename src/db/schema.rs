//! Column declarations for the record shapes and the constraint checks that
//! every engine runs before writing a row.
//!
//! The `id INTEGER PRIMARY KEY AUTOINCREMENT` column is implicit and never
//! listed here.

use super::{EngineError, Record, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Integer,
    Text,
}

/// One column of a record shape.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Text must be non-empty, integers non-zero.
    pub required: bool,
    pub unique: bool,
    /// Create a lookup index next to the table.
    pub indexed: bool,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
}

impl FieldSpec {
    pub const fn integer(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
            required: false,
            unique: false,
            indexed: false,
            min_len: None,
            max_len: None,
        }
    }

    pub const fn text(name: &'static str) -> Self {
        Self {
            kind: FieldKind::Text,
            ..Self::integer(name)
        }
    }

    pub const fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }

    pub const fn length(mut self, min: usize, max: usize) -> Self {
        self.min_len = Some(min);
        self.max_len = Some(max);
        self
    }

    fn column_ddl(&self) -> String {
        let mut ddl = match self.kind {
            FieldKind::Integer => format!("{} INTEGER NOT NULL DEFAULT 0", self.name),
            FieldKind::Text => format!("{} TEXT NOT NULL DEFAULT ''", self.name),
        };
        if self.unique {
            ddl.push_str(" UNIQUE");
        }
        ddl
    }
}

pub const USER_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("flags"),
    FieldSpec::text("name").length(0, 50),
    FieldSpec::text("email").required().indexed(),
    FieldSpec::text("password"),
    FieldSpec::text("email_activation_key").indexed(),
    FieldSpec::integer("created_at"),
    FieldSpec::integer("created_by_user_id"),
];

pub const SESSION_FIELDS: &[FieldSpec] = &[
    FieldSpec::integer("flags"),
    FieldSpec::text("key").unique().length(32, 2000),
    FieldSpec::integer("expires_at"),
    FieldSpec::integer("user_id").required(),
];

/// Position of `name` in the record's value list, `None` for `id` or an
/// unknown column.
pub fn column_index<R: Record>(name: &str) -> Option<usize> {
    R::FIELDS.iter().position(|f| f.name == name)
}

/// Whether `name` can be used in a filter or ordering for this shape.
pub fn is_known_column<R: Record>(name: &str) -> bool {
    name == "id" || column_index::<R>(name).is_some()
}

/// SQLite DDL for the shape: the table plus one index per indexed column.
pub fn create_statements<R: Record>() -> Vec<String> {
    let columns = std::iter::once("id INTEGER PRIMARY KEY AUTOINCREMENT".to_string())
        .chain(R::FIELDS.iter().map(FieldSpec::column_ddl))
        .collect::<Vec<_>>()
        .join(",\n    ");
    let mut stmts = vec![format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        R::TABLE,
        columns
    )];
    stmts.extend(R::FIELDS.iter().filter(|f| f.indexed).map(|f| {
        format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_{col} ON {table}({col})",
            table = R::TABLE,
            col = f.name
        )
    }));
    stmts
}

/// Check declared `required` and length constraints. Uniqueness is left to
/// the storage layer.
pub fn validate<R: Record>(values: &[Value]) -> Result<(), EngineError> {
    for (spec, value) in R::FIELDS.iter().zip(values) {
        match value {
            Value::Integer(i) => {
                if spec.required && *i == 0 {
                    return Err(EngineError::Required {
                        table: R::TABLE,
                        field: spec.name,
                    });
                }
            }
            Value::Text(s) => {
                if spec.required && s.is_empty() {
                    return Err(EngineError::Required {
                        table: R::TABLE,
                        field: spec.name,
                    });
                }
                let len = s.chars().count();
                let min = spec.min_len.unwrap_or(0);
                let max = spec.max_len.unwrap_or(usize::MAX);
                if len < min || len > max {
                    return Err(EngineError::Length {
                        table: R::TABLE,
                        field: spec.name,
                        min,
                        max,
                        len,
                    });
                }
            }
        }
    }
    Ok(())
}
