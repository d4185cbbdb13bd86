use std::env;
use std::fmt;

/// Which document store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    MongoDB,
    Memory,
}

/// Process configuration, read once at start-up and shared read-only afterwards.
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub cors_origins: Vec<String>,
}

// Keeps the secret out of logs.
impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("storage", &self.storage)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse::<u16>()
            .map_err(|e| format!("PORT must be a valid port number: {}", e))?;

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "mongodb".to_string())
            .to_lowercase()
            .as_str()
        {
            "mongodb" | "mongo" => StorageBackend::MongoDB,
            "memory" => StorageBackend::Memory,
            other => return Err(format!("Unknown STORAGE_BACKEND '{}'", other)),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageBackend::MongoDB && database_url.is_none() {
            return Err("DATABASE_URL must be set".to_string());
        }

        let jwt_secret = env::var("JWT_SECRET").map_err(|_| "JWT_SECRET must be set".to_string())?;
        if jwt_secret.trim().is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }

        let jwt_issuer =
            env::var("JWT_ISSUER").unwrap_or_else(|_| "coworking-booking".to_string());

        let token_ttl_hours = env::var("TOKEN_TTL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse::<i64>()
            .map_err(|e| format!("TOKEN_TTL_HOURS must be an integer: {}", e))?;

        let bcrypt_cost = match env::var("BCRYPT_COST") {
            Ok(raw) => raw
                .parse::<u32>()
                .map_err(|e| format!("BCRYPT_COST must be an integer: {}", e))?,
            Err(_) => bcrypt::DEFAULT_COST,
        };

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            host,
            port,
            storage,
            database_url,
            jwt_secret,
            jwt_issuer,
            token_ttl_hours,
            bcrypt_cost,
            cors_origins,
        })
    }

    /// Configuration for tests: in-memory store and the cheapest bcrypt cost.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            storage: StorageBackend::Memory,
            database_url: None,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "coworking-booking-tests".to_string(),
            token_ttl_hours: 1,
            bcrypt_cost: 4,
            cors_origins: vec![],
        }
    }
}
