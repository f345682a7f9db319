use crate::db::schema::{self, FieldKind};
use crate::db::{EngineError, Query, Record, RecordEngine, Value};
use sqlx::query::Query as SqlQuery;
use sqlx::sqlite::{SqliteArguments, SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::str::FromStr;
use tracing::debug;

pub type SqlitePool = Pool<Sqlite>;

type Bound<'q> = SqlQuery<'q, Sqlite, SqliteArguments<'q>>;

/// Open a pool for `database_url`, creating the database file when missing.
pub async fn connect(database_url: &str) -> Result<SqlitePool, EngineError> {
    let connect_opts = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new().connect_with(connect_opts).await?;
    Ok(pool)
}

#[derive(Clone)]
pub struct SqliteEngine {
    pool: SqlitePool,
}

impl SqliteEngine {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn row_to_record<R: Record>(row: SqliteRow) -> Result<R, EngineError> {
        let id: i64 = row.try_get("id")?;
        let values = R::FIELDS
            .iter()
            .map(|f| match f.kind {
                FieldKind::Integer => row.try_get::<i64, _>(f.name).map(Value::Integer),
                FieldKind::Text => row.try_get::<String, _>(f.name).map(Value::Text),
            })
            .collect::<Result<Vec<_>, _>>()?;
        R::from_values(id, values)
    }
}

fn bind(query: Bound<'_>, value: Value) -> Bound<'_> {
    match value {
        Value::Integer(i) => query.bind(i),
        Value::Text(s) => query.bind(s),
    }
}

/// Turn SQLite's `UNIQUE constraint failed: sessions.key` into `EngineError::Unique`.
fn map_write_error(table: &'static str, err: sqlx::Error) -> EngineError {
    if let sqlx::Error::Database(db) = &err
        && db.is_unique_violation()
    {
        let field = db
            .message()
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_string();
        return EngineError::Unique { table, field };
    }
    EngineError::Database(err)
}

impl RecordEngine for SqliteEngine {
    async fn create_schema<R: Record>(&self) -> Result<(), EngineError> {
        for stmt in schema::create_statements::<R>() {
            sqlx::query(&stmt).execute(&self.pool).await?;
        }
        debug!(table = R::TABLE, "schema ready");
        Ok(())
    }

    async fn save<R: Record>(&self, record: &mut R) -> Result<(), EngineError> {
        let values = record.values();
        schema::validate::<R>(&values)?;

        let columns: Vec<&str> = R::FIELDS.iter().map(|f| f.name).collect();
        if record.is_transient() {
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                R::TABLE,
                columns.join(", "),
                vec!["?"; columns.len()].join(", ")
            );
            let query = values.into_iter().fold(sqlx::query(&sql), bind);
            let res = query
                .execute(&self.pool)
                .await
                .map_err(|e| map_write_error(R::TABLE, e))?;
            record.set_id(res.last_insert_rowid());
            debug!(table = R::TABLE, id = record.id(), "inserted row");
        } else {
            let assignments = columns
                .iter()
                .map(|c| format!("{c} = ?"))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!("UPDATE {} SET {} WHERE id = ?", R::TABLE, assignments);
            let query = values.into_iter().fold(sqlx::query(&sql), bind);
            let res = query
                .bind(record.id())
                .execute(&self.pool)
                .await
                .map_err(|e| map_write_error(R::TABLE, e))?;
            if res.rows_affected() == 0 {
                return Err(EngineError::MissingRow {
                    table: R::TABLE,
                    id: record.id(),
                });
            }
            debug!(table = R::TABLE, id = record.id(), "updated row");
        }
        Ok(())
    }

    async fn find<R: Record>(&self, query: &Query) -> Result<Vec<R>, EngineError> {
        query.check_columns::<R>()?;

        let columns = std::iter::once("id")
            .chain(R::FIELDS.iter().map(|f| f.name))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {} FROM {}", columns, R::TABLE);
        if !query.filters.is_empty() {
            let conds = query
                .filters
                .iter()
                .map(|(f, _)| format!("{f} = ?"))
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(" WHERE ");
            sql.push_str(&conds);
        }
        if let Some((field, dir)) = query.order {
            sql.push_str(&format!(" ORDER BY {} {}", field, dir.as_sql()));
        }
        // SQLite only accepts OFFSET after LIMIT; -1 means unbounded.
        let paged = query.limit.is_some() || query.offset > 0;
        if paged {
            sql.push_str(" LIMIT ? OFFSET ?");
        }

        let mut bound = query
            .filters
            .iter()
            .map(|(_, v)| v.clone())
            .fold(sqlx::query(&sql), bind);
        if paged {
            bound = bound
                .bind(query.limit.map(i64::from).unwrap_or(-1))
                .bind(i64::from(query.offset));
        }

        let rows = bound.fetch_all(&self.pool).await?;
        debug!(table = R::TABLE, matched = rows.len(), "find");
        rows.into_iter().map(Self::row_to_record).collect()
    }
}
