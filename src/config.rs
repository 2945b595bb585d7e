use std::str::FromStr;

use anyhow::{Context, Result};

// ---------------------------------------------------------------------------
// StoreBackend
// ---------------------------------------------------------------------------

/// Which document store implementation backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("unknown store backend: {other:?}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    /// Connection string; mandatory for the Postgres backend.
    pub database_url: Option<String>,
    /// Overrides the database named in `database_url` when set.
    pub database_name: Option<String>,
    pub max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup so parsing can be
    /// exercised without mutating the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_owned())
        };
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let store_backend: StoreBackend = optional("STORE_BACKEND", "postgres")
            .parse()
            .context("STORE_BACKEND must be 'postgres' or 'memory'")?;

        let database_url = non_empty("DATABASE_URL");
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("missing required env var: DATABASE_URL");
        }

        Ok(Self {
            store_backend,
            database_url,
            database_name: non_empty("DATABASE_NAME"),
            max_connections: optional("DATABASE_MAX_CONNECTIONS", "10")
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("PORT", "8000")
                .parse()
                .context("PORT must be a valid port number")?,
        })
    }

    /// Configuration for an in-process store with no external database.
    pub fn in_memory() -> Self {
        Self {
            store_backend: StoreBackend::Memory,
            database_url: None,
            database_name: None,
            max_connections: 1,
            server_host: "127.0.0.1".to_owned(),
            server_port: 8000,
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn postgres_defaults() {
        let config =
            Config::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://localhost/iaq")]))
                .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Postgres);
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.max_connections, 10);
        assert!(config.database_name.is_none());
    }

    #[test]
    fn postgres_requires_database_url() {
        let err = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn memory_backend_needs_no_url() {
        let config = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("PORT", "9001"),
            ("DATABASE_NAME", "iaq"),
        ]))
        .unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.server_port, 9001);
        assert_eq!(config.database_name.as_deref(), Some("iaq"));
        assert_eq!(config.bind_address(), "0.0.0.0:9001");
    }

    #[test]
    fn invalid_port_errors() {
        let err = Config::from_lookup(lookup_from(&[
            ("STORE_BACKEND", "memory"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }

    #[test]
    fn unknown_backend_errors() {
        let err = Config::from_lookup(lookup_from(&[("STORE_BACKEND", "mongo")])).unwrap_err();
        assert!(err.to_string().contains("STORE_BACKEND"));
    }

    #[test]
    fn store_backend_from_str() {
        assert_eq!("Postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }
}
