use super::find_first;
use crate::db::{RecordEngine, Session};
use crate::error::UmbrellaError;
use tracing::debug;

/// Reads and writes one [`Session`] through a mapping engine.
pub struct SessionAccessor<E> {
    engine: E,
    session: Session,
}

impl<E: RecordEngine> SessionAccessor<E> {
    pub fn new(engine: E) -> Self {
        Self::with_record(engine, Session::default())
    }

    pub fn with_record(engine: E, session: Session) -> Self {
        Self { engine, session }
    }

    pub fn record(&self) -> &Session {
        &self.session
    }

    pub fn into_record(self) -> Session {
        self.session
    }

    pub async fn create_table(&self) -> Result<(), UmbrellaError> {
        self.engine
            .create_schema::<Session>()
            .await
            .map_err(UmbrellaError::storage("creating sessions table"))
    }

    pub fn id(&self) -> i64 {
        self.session.id
    }

    pub fn flags(&self) -> i64 {
        self.session.flags
    }

    pub fn key(&self) -> &str {
        &self.session.key
    }

    pub fn expires_at(&self) -> i64 {
        self.session.expires_at
    }

    pub fn user_id(&self) -> i64 {
        self.session.user_id
    }

    pub fn set_flags(&mut self, flags: i64) {
        self.session.flags = flags;
    }

    pub fn set_key(&mut self, key: impl Into<String>) {
        self.session.key = key.into();
    }

    pub fn set_expires_at(&mut self, expires_at: i64) {
        self.session.expires_at = expires_at;
    }

    pub fn set_user_id(&mut self, user_id: i64) {
        self.session.user_id = user_id;
    }

    /// Whether the session has expired at unix time `now`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.session.expires_at <= now
    }

    pub async fn save(&mut self) -> Result<(), UmbrellaError> {
        self.engine
            .save(&mut self.session)
            .await
            .inspect_err(|e| {
                debug!(user_id = self.session.user_id, error = %e, "session save rejected")
            })
            .map_err(UmbrellaError::storage("saving session"))
    }

    pub async fn find_by_key(&mut self, key: &str) -> Result<Option<Session>, UmbrellaError> {
        find_first(
            &self.engine,
            &mut self.session,
            "key",
            key,
            "finding session by key",
        )
        .await
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<Session>, UmbrellaError> {
        find_first(
            &self.engine,
            &mut self.session,
            "id",
            id,
            "finding session by id",
        )
        .await
    }
}
