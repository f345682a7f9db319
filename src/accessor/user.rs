use super::find_first;
use crate::db::{RecordEngine, User};
use crate::error::UmbrellaError;
use chrono::Utc;
use tracing::debug;

/// Reads and writes one [`User`] through a mapping engine.
pub struct UserAccessor<E> {
    engine: E,
    user: User,
}

impl<E: RecordEngine> UserAccessor<E> {
    /// Bind a fresh, transient user to `engine`.
    pub fn new(engine: E) -> Self {
        Self::with_record(engine, User::default())
    }

    pub fn with_record(engine: E, user: User) -> Self {
        Self { engine, user }
    }

    pub fn record(&self) -> &User {
        &self.user
    }

    pub fn into_record(self) -> User {
        self.user
    }

    pub async fn create_table(&self) -> Result<(), UmbrellaError> {
        self.engine
            .create_schema::<User>()
            .await
            .map_err(UmbrellaError::storage("creating users table"))
    }

    pub fn id(&self) -> i64 {
        self.user.id
    }

    pub fn flags(&self) -> i64 {
        self.user.flags
    }

    pub fn name(&self) -> &str {
        &self.user.name
    }

    pub fn email(&self) -> &str {
        &self.user.email
    }

    pub fn password(&self) -> &str {
        &self.user.password
    }

    pub fn email_activation_key(&self) -> &str {
        &self.user.email_activation_key
    }

    pub fn created_at(&self) -> i64 {
        self.user.created_at
    }

    pub fn created_by_user_id(&self) -> i64 {
        self.user.created_by_user_id
    }

    pub fn set_flags(&mut self, flags: i64) {
        self.user.flags = flags;
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.user.name = name.into();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.user.email = email.into();
    }

    /// Stored as given; hashing is the caller's job.
    pub fn set_password(&mut self, password: impl Into<String>) {
        self.user.password = password.into();
    }

    pub fn set_email_activation_key(&mut self, key: impl Into<String>) {
        self.user.email_activation_key = key.into();
    }

    pub fn set_created_at(&mut self, created_at: i64) {
        self.user.created_at = created_at;
    }

    pub fn set_created_by_user_id(&mut self, user_id: i64) {
        self.user.created_by_user_id = user_id;
    }

    /// Insert the user if it has no id yet, update it in place otherwise.
    ///
    /// A transient user with no `created_at` is stamped with the current time.
    pub async fn save(&mut self) -> Result<(), UmbrellaError> {
        let inserting = self.user.id == 0;
        if inserting && self.user.created_at == 0 {
            self.user.created_at = Utc::now().timestamp();
        }
        self.engine
            .save(&mut self.user)
            .await
            .inspect_err(|e| debug!(inserting, error = %e, "user save rejected"))
            .map_err(UmbrellaError::storage("saving user"))
    }

    pub async fn find_by_id(&mut self, id: i64) -> Result<Option<User>, UmbrellaError> {
        find_first(&self.engine, &mut self.user, "id", id, "finding user by id").await
    }

    pub async fn find_by_email(&mut self, email: &str) -> Result<Option<User>, UmbrellaError> {
        find_first(
            &self.engine,
            &mut self.user,
            "email",
            email,
            "finding user by email",
        )
        .await
    }

    pub async fn find_by_activation_key(
        &mut self,
        key: &str,
    ) -> Result<Option<User>, UmbrellaError> {
        find_first(
            &self.engine,
            &mut self.user,
            "email_activation_key",
            key,
            "finding user by activation key",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryEngine;

    async fn accessor() -> UserAccessor<MemoryEngine> {
        let users = UserAccessor::new(MemoryEngine::new());
        users.create_table().await.unwrap();
        users
    }

    #[tokio::test]
    async fn save_then_find_by_email_round_trips() {
        let mut users = accessor().await;
        users.set_email("a@example.com");
        users.set_name("Alice");
        users.set_password("$argon2id$placeholder");
        users.set_flags(0b101);
        users.set_created_by_user_id(7);
        users.save().await.unwrap();
        assert_eq!(users.id(), 1);
        assert!(users.created_at() > 0);
        let saved = users.record().clone();

        let mut other = UserAccessor::new(users.engine.clone());
        let found = other.find_by_email("a@example.com").await.unwrap();
        assert_eq!(found.as_ref(), Some(&saved));
        assert_eq!(other.record(), &saved);
    }

    #[tokio::test]
    async fn missing_email_is_not_an_error() {
        let mut users = accessor().await;
        users.set_email("a@example.com");
        users.save().await.unwrap();

        users.set_name("unsaved change");
        let found = users.find_by_email("missing@example.com").await.unwrap();
        assert!(found.is_none());
        assert_eq!(users.name(), "unsaved change");
    }

    #[tokio::test]
    async fn empty_email_is_rejected() {
        let mut users = accessor().await;
        users.set_name("nobody");
        let err = users.save().await.unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().starts_with("saving user: "));
        assert_eq!(users.id(), 0);
    }

    #[tokio::test]
    async fn name_longer_than_fifty_characters_is_rejected() {
        let mut users = accessor().await;
        users.set_email("a@example.com");
        users.set_name("n".repeat(51));
        assert!(users.save().await.unwrap_err().is_validation());
        users.set_name("n".repeat(50));
        users.save().await.unwrap();
    }

    #[tokio::test]
    async fn successful_find_discards_unsaved_changes() {
        let mut users = accessor().await;
        users.set_email("a@example.com");
        users.save().await.unwrap();

        users.set_email("changed@example.com");
        let found = users.find_by_id(1).await.unwrap().unwrap();
        assert_eq!(found.email, "a@example.com");
        assert_eq!(users.email(), "a@example.com");
    }

    #[tokio::test]
    async fn update_keeps_id_and_other_fields() {
        let mut users = accessor().await;
        users.set_email("a@example.com");
        users.set_email_activation_key("activate-me");
        users.save().await.unwrap();
        let before = users.record().clone();

        users.set_flags(1);
        users.save().await.unwrap();
        assert_eq!(users.id(), before.id);

        let after = users.find_by_activation_key("activate-me").await.unwrap().unwrap();
        assert_eq!(after, User { flags: 1, ..before });
    }

    #[tokio::test]
    async fn duplicate_emails_resolve_to_lowest_id() {
        let engine = MemoryEngine::new();
        let mut first = UserAccessor::new(engine.clone());
        first.create_table().await.unwrap();
        first.set_email("dup@example.com");
        first.set_name("first");
        first.save().await.unwrap();

        let mut second = UserAccessor::new(engine.clone());
        second.set_email("dup@example.com");
        second.set_name("second");
        second.save().await.unwrap();

        let mut lookup = UserAccessor::new(engine);
        let found = lookup.find_by_email("dup@example.com").await.unwrap().unwrap();
        assert_eq!(found.name, "first");
    }

    #[tokio::test]
    async fn explicit_created_at_is_kept() {
        let mut users = accessor().await;
        users.set_email("a@example.com");
        users.set_created_at(1_600_000_000);
        users.save().await.unwrap();
        assert_eq!(users.into_record().created_at, 1_600_000_000);
    }
}
