use {
    crate::{
        domain::{
            action::{ActionConfig, default_catalog},
            error::AuditError,
        },
        infra::search::opensearch::{DEFAULT_ALIAS, DEFAULT_INDEX},
        services::{audit_service::ServiceMode, enrichment::SystemUserDefaults, index_retry::RetryPolicy},
    },
    std::{env, net::SocketAddr, path::PathBuf, str::FromStr, time::Duration},
};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub search_url: String,
    pub search_index: String,
    pub search_alias: String,
    pub mode: ServiceMode,
    pub actions_path: Option<PathBuf>,
    pub readers: Vec<String>,
    pub system_user: SystemUserDefaults,
    pub retry: RetryPolicy,
    pub bind_addr: SocketAddr,
}

fn parse<T: FromStr>(key: &str, raw: Option<String>, default: T) -> Result<T, AuditError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| AuditError::Config(format!("{key}={raw:?}: {e}"))),
    }
}

fn parse_bool(key: &str, raw: Option<String>, default: bool) -> Result<bool, AuditError> {
    match raw.as_deref().map(str::trim).map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(AuditError::Config(format!("{key}={other:?}: expected a boolean"))),
    }
}

fn non_empty(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Config {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self, AuditError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AuditError> {
        let database_url = non_empty(lookup("DATABASE_URL"))
            .ok_or_else(|| AuditError::Config("DATABASE_URL must be set".into()))?;

        let enabled = parse_bool("AUDIT_LOGS_ENABLED", lookup("AUDIT_LOGS_ENABLED"), true)?;
        let max_attempts = parse("INDEX_RETRY_MAX_ATTEMPTS", lookup("INDEX_RETRY_MAX_ATTEMPTS"), 5u32)?;
        if max_attempts == 0 {
            return Err(AuditError::Config("INDEX_RETRY_MAX_ATTEMPTS must be at least 1".into()));
        }
        let base_delay_ms = parse("INDEX_RETRY_BASE_DELAY_MS", lookup("INDEX_RETRY_BASE_DELAY_MS"), 1000u64)?;

        let readers = lookup("AUDIT_LOG_READERS")
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            database_url,
            database_max_connections: parse(
                "DATABASE_MAX_CONNECTIONS",
                lookup("DATABASE_MAX_CONNECTIONS"),
                20,
            )?,
            search_url: non_empty(lookup("SEARCH_URL"))
                .unwrap_or_else(|| "http://localhost:9200".to_string()),
            search_index: non_empty(lookup("SEARCH_INDEX")).unwrap_or_else(|| DEFAULT_INDEX.to_string()),
            search_alias: non_empty(lookup("SEARCH_ALIAS")).unwrap_or_else(|| DEFAULT_ALIAS.to_string()),
            mode: if enabled {
                ServiceMode::Enabled
            } else {
                ServiceMode::Disabled
            },
            actions_path: non_empty(lookup("AUDIT_ACTIONS_PATH")).map(PathBuf::from),
            readers,
            system_user: SystemUserDefaults {
                name: non_empty(lookup("AUDIT_SYSTEM_USER_NAME")),
                email: non_empty(lookup("AUDIT_SYSTEM_USER_EMAIL")),
            },
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(base_delay_ms),
            },
            bind_addr: parse("BIND_ADDR", lookup("BIND_ADDR"), SocketAddr::from(([0, 0, 0, 0], 3000)))?,
        })
    }

    /// The configured action catalog, or the built-in one.
    pub fn load_actions(&self) -> Result<Vec<ActionConfig>, AuditError> {
        let Some(path) = &self.actions_path else {
            return Ok(default_catalog());
        };
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AuditError::Config(format!("reading {}: {e}", path.display())))?;
        Ok(serde_json::from_str(&raw)?)
    }
}
