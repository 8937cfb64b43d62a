use std::sync::Arc;

use configs::AppConfig;
use sea_orm::DatabaseConnection;
use service::auth::repo::seaorm::SeaOrmAuthRepository;
use service::auth::{AuthConfig, AuthService};

/// Shared handler state; cloned per request.
#[derive(Clone)]
pub struct ServerState {
    pub db: DatabaseConnection,
    pub auth: Arc<AuthService<SeaOrmAuthRepository>>,
    pub config: Arc<AppConfig>,
}

impl ServerState {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let auth_cfg = AuthConfig::new(config.auth.jwt_secret.clone(), config.auth.token_ttl_secs as i64);
        let repo = Arc::new(SeaOrmAuthRepository::new(db.clone()));
        Self { db, auth: Arc::new(AuthService::new(repo, auth_cfg)), config: Arc::new(config) }
    }
}
