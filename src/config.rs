use crate::error::UmbrellaError;
use figment::{
    Figment,
    providers::{Env, Serialized},
};
use serde::{Deserialize, Serialize};

/// Runtime settings. Every key can be overridden with an `UMBRELLA_`-prefixed
/// environment variable, e.g. `UMBRELLA_DATABASE_URL`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub loglevel: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:umbrella.db".to_string(),
            loglevel: "info".to_string(),
        }
    }
}

impl Config {
    pub fn figment() -> Figment {
        Figment::from(Serialized::defaults(Config::default())).merge(Env::prefixed("UMBRELLA_"))
    }

    pub fn load() -> Result<Self, UmbrellaError> {
        Ok(Self::figment().extract()?)
    }
}
