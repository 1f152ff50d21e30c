//! Shared application state.

use std::sync::Arc;
use stitch_db::Database;

use crate::auth::JwtVerifier;
use crate::config::WebConfig;

/// State handed to every handler; cloning is cheap.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub config: Arc<WebConfig>,
    pub jwt: Arc<JwtVerifier>,
}

impl AppState {
    pub fn new(db: Database, config: WebConfig) -> Self {
        let jwt = JwtVerifier::new(&config.auth.jwt_secret, &config.auth.audience);

        AppState {
            db,
            config: Arc::new(config),
            jwt: Arc::new(jwt),
        }
    }
}
