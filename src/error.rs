use crate::db::EngineError;
use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum UmbrellaError {
    /// An engine failure, tagged with the accessor operation that hit it.
    #[error("{op}: {source}")]
    Storage {
        op: &'static str,
        #[source]
        source: EngineError,
    },

    #[error("Config error: {0}")]
    Config(#[from] Box<figment::Error>),
}

impl UmbrellaError {
    /// Wrap an engine error with the name of the failing operation.
    pub fn storage(op: &'static str) -> impl FnOnce(EngineError) -> Self {
        move |source| UmbrellaError::Storage { op, source }
    }

    pub fn engine(&self) -> Option<&EngineError> {
        match self {
            UmbrellaError::Storage { source, .. } => Some(source),
            UmbrellaError::Config(_) => None,
        }
    }

    /// True when a save collided with a unique column.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self.engine(), Some(EngineError::Unique { .. }))
    }

    /// True when a save was refused by a declared required/length constraint.
    pub fn is_validation(&self) -> bool {
        matches!(
            self.engine(),
            Some(EngineError::Required { .. } | EngineError::Length { .. })
        )
    }
}

impl From<figment::Error> for UmbrellaError {
    fn from(e: figment::Error) -> Self {
        UmbrellaError::Config(Box::new(e))
    }
}
