use storefront_infra::CatalogConfig;

pub const DEFAULT_PORT: u16 = 8000;

/// Process configuration for the API binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub port: u16,
    /// Postgres connection string; the in-memory store is used when unset.
    pub database_url: Option<String>,
    pub catalog: CatalogConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            catalog: CatalogConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        let port = match std::env::var("PORT") {
            Err(_) => DEFAULT_PORT,
            Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, "PORT is not a valid port; using {DEFAULT_PORT}");
                DEFAULT_PORT
            }),
        };
        let database_url = std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty());

        Self {
            port,
            database_url,
            catalog: CatalogConfig::from_env(),
        }
    }
}
