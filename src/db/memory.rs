use crate::db::schema;
use crate::db::{Direction, EngineError, Query, Record, RecordEngine, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Vec<Value>>,
}

/// Engine that keeps tables in process memory.
///
/// Runs the same constraint checks as the SQLite engine, including
/// uniqueness, so accessors behave identically against either one.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    tables: Arc<Mutex<HashMap<&'static str, Table>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows in `R`'s table, `None` if it was never created.
    pub async fn row_count<R: Record>(&self) -> Option<usize> {
        self.tables.lock().await.get(R::TABLE).map(|t| t.rows.len())
    }
}

fn check_unique<R: Record>(table: &Table, id: i64, values: &[Value]) -> Result<(), EngineError> {
    for (idx, spec) in R::FIELDS.iter().enumerate().filter(|(_, f)| f.unique) {
        let clash = table
            .rows
            .iter()
            .any(|(row_id, row)| *row_id != id && row.get(idx) == values.get(idx));
        if clash {
            return Err(EngineError::Unique {
                table: R::TABLE,
                field: spec.name.to_string(),
            });
        }
    }
    Ok(())
}

fn column<'a, R: Record>(id: &'a i64, row: &'a [Value], field: &str) -> Option<ColumnRef<'a>> {
    if field == "id" {
        return Some(ColumnRef::Id(*id));
    }
    schema::column_index::<R>(field)
        .and_then(|idx| row.get(idx))
        .map(ColumnRef::Value)
}

#[derive(PartialEq, Eq, PartialOrd, Ord)]
enum ColumnRef<'a> {
    Id(i64),
    Value(&'a Value),
}

impl ColumnRef<'_> {
    fn matches(&self, expected: &Value) -> bool {
        match self {
            ColumnRef::Id(id) => *expected == Value::Integer(*id),
            ColumnRef::Value(v) => *v == expected,
        }
    }
}

impl RecordEngine for MemoryEngine {
    async fn create_schema<R: Record>(&self) -> Result<(), EngineError> {
        self.tables.lock().await.entry(R::TABLE).or_default();
        debug!(table = R::TABLE, "schema ready");
        Ok(())
    }

    async fn save<R: Record>(&self, record: &mut R) -> Result<(), EngineError> {
        let values = record.values();
        schema::validate::<R>(&values)?;

        let mut tables = self.tables.lock().await;
        let table = tables
            .get_mut(R::TABLE)
            .ok_or(EngineError::NoSuchTable(R::TABLE))?;
        check_unique::<R>(table, record.id(), &values)?;

        if record.is_transient() {
            table.last_id += 1;
            let id = table.last_id;
            table.rows.insert(id, values);
            record.set_id(id);
            debug!(table = R::TABLE, id, "inserted row");
        } else {
            let id = record.id();
            let row = table.rows.get_mut(&id).ok_or(EngineError::MissingRow {
                table: R::TABLE,
                id,
            })?;
            *row = values;
            debug!(table = R::TABLE, id, "updated row");
        }
        Ok(())
    }

    async fn find<R: Record>(&self, query: &Query) -> Result<Vec<R>, EngineError> {
        query.check_columns::<R>()?;

        let tables = self.tables.lock().await;
        let table = tables
            .get(R::TABLE)
            .ok_or(EngineError::NoSuchTable(R::TABLE))?;

        // BTreeMap iteration is already id ascending.
        let mut matched: Vec<(&i64, &Vec<Value>)> = table
            .rows
            .iter()
            .filter(|(id, row)| {
                query.filters.iter().all(|(field, expected)| {
                    column::<R>(id, row, field).is_some_and(|c| c.matches(expected))
                })
            })
            .collect();

        if let Some((field, dir)) = query.order {
            matched.sort_by(|(a_id, a), (b_id, b)| {
                let ord = column::<R>(a_id, a, field).cmp(&column::<R>(b_id, b, field));
                match dir {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        let limit = query.limit.map(|l| l as usize).unwrap_or(usize::MAX);
        let records = matched
            .into_iter()
            .skip(query.offset as usize)
            .take(limit)
            .map(|(id, row)| R::from_values(*id, row.clone()))
            .collect::<Result<Vec<R>, _>>()?;
        debug!(table = R::TABLE, matched = records.len(), "find");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Session, User};

    fn user(email: &str, name: &str) -> User {
        User {
            email: email.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn save_before_create_schema_fails() {
        let engine = MemoryEngine::new();
        let mut u = user("a@example.com", "");
        let err = engine.save(&mut u).await.unwrap_err();
        assert!(matches!(err, EngineError::NoSuchTable("users")));
        assert_eq!(u.id, 0);
    }

    #[tokio::test]
    async fn ids_are_assigned_sequentially_and_kept_on_update() {
        let engine = MemoryEngine::new();
        engine.create_schema::<User>().await.unwrap();

        let mut a = user("a@example.com", "a");
        let mut b = user("b@example.com", "b");
        engine.save(&mut a).await.unwrap();
        engine.save(&mut b).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        a.name = "renamed".into();
        engine.save(&mut a).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(engine.row_count::<User>().await, Some(2));
    }

    #[tokio::test]
    async fn update_of_unknown_id_is_missing_row() {
        let engine = MemoryEngine::new();
        engine.create_schema::<User>().await.unwrap();
        let mut ghost = user("ghost@example.com", "");
        ghost.id = 42;
        let err = engine.save(&mut ghost).await.unwrap_err();
        assert!(matches!(err, EngineError::MissingRow { id: 42, .. }));
    }

    #[tokio::test]
    async fn unique_key_is_enforced_but_resaving_same_row_is_fine() {
        let engine = MemoryEngine::new();
        engine.create_schema::<Session>().await.unwrap();
        let key = "s".repeat(40);

        let mut first = Session {
            key: key.clone(),
            user_id: 1,
            ..Default::default()
        };
        engine.save(&mut first).await.unwrap();
        first.expires_at = 10;
        engine.save(&mut first).await.unwrap();

        let mut second = Session {
            key,
            user_id: 2,
            ..Default::default()
        };
        let err = engine.save(&mut second).await.unwrap_err();
        assert!(matches!(err, EngineError::Unique { table: "sessions", ref field } if field == "key"));
        assert_eq!(second.id, 0);
    }

    #[tokio::test]
    async fn find_filters_orders_and_pages() {
        let engine = MemoryEngine::new();
        engine.create_schema::<User>().await.unwrap();
        for (email, name) in [
            ("dup@example.com", "b"),
            ("other@example.com", "z"),
            ("dup@example.com", "a"),
            ("dup@example.com", "c"),
        ] {
            engine.save(&mut user(email, name)).await.unwrap();
        }

        let first: Vec<User> = engine
            .find(&Query::first_by("email", "dup@example.com"))
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].id, 1);

        let by_name: Vec<User> = engine
            .find(
                &Query::new()
                    .filter("email", "dup@example.com")
                    .order_by("name", Direction::Desc)
                    .offset(1),
            )
            .await
            .unwrap();
        let names: Vec<_> = by_name.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["b", "a"]);

        let by_id: Vec<User> = engine.find(&Query::first_by("id", 2_i64)).await.unwrap();
        assert_eq!(by_id[0].email, "other@example.com");
    }

    #[tokio::test]
    async fn find_rejects_unknown_columns() {
        let engine = MemoryEngine::new();
        engine.create_schema::<Session>().await.unwrap();
        let err = engine
            .find::<Session>(&Query::first_by("token", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownField { .. }));
    }
}
