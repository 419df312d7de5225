//! Server configuration

use ride_db::ServiceConfig;
use std::time::Duration;

use crate::middleware::{JwtConfig, JwtConfigError};

/// Runtime configuration of the API server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
    /// Postgres URL; the in-memory datastore is used when absent
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Required `iss` claim, when set
    pub jwt_issuer: Option<String>,
    /// Required `aud` claim, when set
    pub jwt_audience: Option<String>,
    pub request_timeout_secs: u64,
    pub policy_cache_ttl_secs: u64,
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            jwt_secret: String::new(),
            jwt_issuer: None,
            jwt_audience: None,
            request_timeout_secs: 10,
            policy_cache_ttl_secs: 60,
            enable_cors: false,
        }
    }
}

impl ServerConfig {
    /// Read `RIDE_API_*`, `RIDE_*` and `DATABASE_URL` from the environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse::<u64>().ok());

        Self {
            bind_addr: lookup("RIDE_API_BIND_ADDR").unwrap_or(defaults.bind_addr),
            port: lookup("RIDE_API_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(defaults.port),
            database_url: lookup("DATABASE_URL").filter(|v| !v.trim().is_empty()),
            jwt_secret: lookup("RIDE_JWT_SECRET").unwrap_or(defaults.jwt_secret),
            jwt_issuer: lookup("RIDE_JWT_ISSUER").filter(|v| !v.trim().is_empty()),
            jwt_audience: lookup("RIDE_JWT_AUDIENCE").filter(|v| !v.trim().is_empty()),
            request_timeout_secs: parsed("RIDE_REQUEST_TIMEOUT_SECS")
                .unwrap_or(defaults.request_timeout_secs),
            policy_cache_ttl_secs: parsed("RIDE_POLICY_CACHE_TTL_SECS")
                .unwrap_or(defaults.policy_cache_ttl_secs),
            enable_cors: lookup("RIDE_ENABLE_CORS")
                .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(defaults.enable_cors),
        }
    }

    /// Token validation settings; fails on a short secret
    pub fn jwt_config(&self) -> Result<JwtConfig, JwtConfigError> {
        let mut jwt = JwtConfig::try_new(self.jwt_secret.clone())?;
        if let Some(issuer) = &self.jwt_issuer {
            jwt = jwt.with_issuer(issuer.clone());
        }
        if let Some(audience) = &self.jwt_audience {
            jwt = jwt.with_audience(audience.clone());
        }
        Ok(jwt)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            operation_timeout: Duration::from_secs(self.request_timeout_secs.max(1)),
            policy_cache_ttl: Duration::from_secs(self.policy_cache_ttl_secs),
            ..ServiceConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_from_lookup() {
        let env: HashMap<&str, &str> = [
            ("RIDE_API_PORT", "9000"),
            ("RIDE_REQUEST_TIMEOUT_SECS", "3"),
            ("RIDE_ENABLE_CORS", "true"),
            ("DATABASE_URL", "postgres://localhost/rides"),
            ("RIDE_JWT_SECRET", "0123456789abcdef0123456789abcdef"),
            ("RIDE_JWT_ISSUER", "ride-auth"),
        ]
        .into_iter()
        .collect();
        let config = ServerConfig::from_lookup(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.port, 9000);
        assert_eq!(config.bind_addr, "0.0.0.0");
        assert!(config.enable_cors);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/rides"));
        assert_eq!(config.service_config().operation_timeout, Duration::from_secs(3));

        let jwt = config.jwt_config().unwrap();
        assert_eq!(jwt.issuer.as_deref(), Some("ride-auth"));
        assert_eq!(jwt.audience, None);
    }

    #[test]
    fn test_jwt_config_requires_long_secret() {
        let config = ServerConfig {
            jwt_secret: "short".to_string(),
            ..ServerConfig::default()
        };
        assert!(config.jwt_config().is_err());
    }

    #[test]
    fn test_bad_values_use_defaults() {
        let config = ServerConfig::from_lookup(|k| match k {
            "RIDE_API_PORT" => Some("not-a-port".to_string()),
            "DATABASE_URL" => Some("  ".to_string()),
            "RIDE_JWT_AUDIENCE" => Some("".to_string()),
            _ => None,
        });
        assert_eq!(config.port, 8080);
        assert!(config.database_url.is_none());
        assert!(config.jwt_audience.is_none());
        assert_eq!(config.service_config().policy_cache_ttl, Duration::from_secs(60));
    }
}
