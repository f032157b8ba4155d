use std::time::Duration;

use super::error::{CouchDaoError, CouchResult};

const DEFAULT_DATABASE: &str = "hot_seat";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and how to reach the CouchDB server holding session documents.
#[derive(Debug, Clone)]
pub struct CouchConfig {
    /// Server URL without the database segment or a trailing slash.
    pub base_url: String,
    /// Database holding session documents.
    pub database: String,
    /// Basic-auth user and password.
    pub credentials: Option<(String, String)>,
    /// Upper bound on every request.
    pub timeout: Duration,
}

impl CouchConfig {
    /// Configuration for `database` on `base_url`, without credentials.
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            database: database.into(),
            credentials: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Read `COUCH_BASE_URL` (required), `COUCH_DB`, `COUCH_USERNAME`/`COUCH_PASSWORD`
    /// and `COUCH_TIMEOUT_MS`.
    pub fn from_env() -> CouchResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CouchResult<Self> {
        let base_url = lookup("COUCH_BASE_URL").ok_or(CouchDaoError::MissingEnvVar {
            var: "COUCH_BASE_URL",
        })?;
        let database = lookup("COUCH_DB")
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_owned());

        let mut config = Self::new(base_url, database);
        config.credentials = lookup("COUCH_USERNAME").zip(lookup("COUCH_PASSWORD"));
        if let Some(millis) = lookup("COUCH_TIMEOUT_MS").and_then(|raw| raw.parse::<u64>().ok()) {
            config.timeout = Duration::from_millis(millis.max(1));
        }

        Ok(config)
    }

    /// URL of the session database.
    pub fn database_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database)
    }
}
