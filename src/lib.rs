pub mod accessor;
pub mod config;
pub mod db;
pub mod error;

pub use accessor::{SessionAccessor, UserAccessor};
pub use db::{MemoryEngine, RecordEngine, Session, SqliteEngine, User};
pub use error::UmbrellaError;
