use std::path::{Path, PathBuf};

use ivd_core::district::District;
use ivd_core::submission::DEFAULT_REVIEWER;

/// Which [`DatasetStore`](ivd_core::store::DatasetStore) the server talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// The managed Supabase project (production).
    Supabase,
    /// An in-process store seeded from a file, for local runs.
    Memory,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "supabase" => Some(Self::Supabase),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Supabase => "supabase",
            Self::Memory => "memory",
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Contribution sessions untouched for this long are torn down
    /// (default: `1800`).
    pub session_idle_timeout_secs: u64,
    /// Identity recorded on review decisions (default: `admin`).
    pub reviewer: String,
    pub store_backend: StoreBackend,
    /// JSON array of districts for the memory backend.
    pub district_seed_file: Option<PathBuf>,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                     | Default                 |
    /// |-----------------------------|-------------------------|
    /// | `HOST`                      | `0.0.0.0`               |
    /// | `PORT`                      | `3000`                  |
    /// | `CORS_ORIGINS`              | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`      | `30`                    |
    /// | `SESSION_IDLE_TIMEOUT_SECS` | `1800`                  |
    /// | `REVIEWER_IDENTITY`         | `admin`                 |
    /// | `STORE_BACKEND`             | `supabase`              |
    /// | `DISTRICT_SEED_FILE`        | none                    |
    ///
    /// Supabase settings are read separately by
    /// [`SupabaseConfig::from_env`](ivd_supabase::SupabaseConfig::from_env).
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let session_idle_timeout_secs: u64 = std::env::var("SESSION_IDLE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "1800".into())
            .parse()
            .expect("SESSION_IDLE_TIMEOUT_SECS must be a valid u64");

        let reviewer = std::env::var("REVIEWER_IDENTITY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_REVIEWER.into());

        let backend = std::env::var("STORE_BACKEND").unwrap_or_else(|_| "supabase".into());
        let store_backend = StoreBackend::parse(&backend).unwrap_or_else(|| {
            panic!("STORE_BACKEND must be 'supabase' or 'memory', got '{backend}'")
        });

        let district_seed_file = std::env::var("DISTRICT_SEED_FILE")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            session_idle_timeout_secs,
            reviewer,
            store_backend,
            district_seed_file,
        }
    }
}

/// Errors reading the district seed file.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    #[error("Failed to read district seed '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("District seed '{path}' is not a JSON array of districts: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Read a JSON array of `{ id, state, district_name }` objects.
pub fn read_district_seed(path: &Path) -> Result<Vec<District>, SeedError> {
    let raw = std::fs::read_to_string(path).map_err(|source| SeedError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| SeedError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn backend_names() {
        assert_eq!(StoreBackend::parse("Supabase"), Some(StoreBackend::Supabase));
        assert_eq!(StoreBackend::parse(" memory "), Some(StoreBackend::Memory));
        assert_eq!(StoreBackend::parse("postgres"), None);
        assert_eq!(StoreBackend::Memory.as_str(), "memory");
    }

    #[test]
    fn reads_seed_file() {
        let path = std::env::temp_dir().join(format!("ivd-seed-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"id":"6f1c1f36-3d4b-4c8e-9a57-0b0f3c1f2a11","state":"Goa","district_name":"North Goa"}]"#,
        )
        .unwrap();

        let districts = read_district_seed(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(districts.len(), 1);
        assert_eq!(districts[0].display_name(), "North Goa, Goa");
    }

    #[test]
    fn missing_or_malformed_seed_is_reported() {
        let missing = std::env::temp_dir().join("ivd-seed-does-not-exist.json");
        assert_matches!(read_district_seed(&missing), Err(SeedError::Io { .. }));

        let path = std::env::temp_dir().join(format!("ivd-seed-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(&path, "{\"not\": \"an array\"}").unwrap();
        let result = read_district_seed(&path);
        std::fs::remove_file(&path).ok();
        assert_matches!(result, Err(SeedError::Parse { .. }));
    }
}
