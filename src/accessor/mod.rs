//! Accessors bind one in-memory record to a mapping engine.
//!
//! Each accessor owns exactly one record; mutations go through `&mut self`,
//! so a single accessor is never shared between concurrent callers.

pub mod session;
pub mod user;

pub use session::SessionAccessor;
pub use user::UserAccessor;

use crate::db::{Query, Record, RecordEngine, Value};
use crate::error::UmbrellaError;

/// Single-row lookup shared by every `find_by_*`: equality on `field`,
/// lowest id wins. Returns the match and leaves `current` untouched otherwise.
async fn find_first<E, R>(
    engine: &E,
    current: &mut R,
    field: &'static str,
    value: impl Into<Value>,
    op: &'static str,
) -> Result<Option<R>, UmbrellaError>
where
    E: RecordEngine,
    R: Record,
{
    let mut rows = engine
        .find::<R>(&Query::first_by(field, value))
        .await
        .map_err(UmbrellaError::storage(op))?;
    if rows.is_empty() {
        return Ok(None);
    }
    let found = rows.swap_remove(0);
    *current = found.clone();
    Ok(Some(found))
}
