//! Application state for the Pursue API service.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use pursue_core::Services;
use pursue_db::Repositories;
use std::sync::Arc;

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Business services
    pub services: Services,
    /// Repositories (user lookup and readiness)
    pub repos: Repositories,
    /// Configuration
    pub config: Arc<Config>,
    /// Bearer token verification
    pub jwt: Arc<JwtVerifier>,
}

impl AppState {
    /// Create new application state
    pub fn new(repos: Repositories, config: Config) -> Self {
        let services = Services::new(repos.clone(), config.core.clone());
        let jwt = JwtVerifier::new(&config.jwt_secret);
        Self {
            services,
            repos,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// HS256 key plus validation rules
pub struct JwtVerifier {
    pub key: DecodingKey,
    pub validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}
