use sea_orm::DatabaseConnection;
use uuid::Uuid;

use models::{role, user, user_credentials};

use crate::auth::domain::{AuthUser, Credentials};
use crate::auth::errors::AuthError;
use crate::auth::repository::AuthRepository;

pub struct SeaOrmAuthRepository {
    pub db: DatabaseConnection,
}

impl SeaOrmAuthRepository {
    pub fn new(db: DatabaseConnection) -> Self { Self { db } }

    async fn to_auth_user(&self, u: user::Model) -> Result<AuthUser, AuthError> {
        let role = match u.role_id {
            Some(role_id) => role::find_by_id(&self.db, role_id)
                .await
                .map_err(|e| AuthError::Repository(e.to_string()))?
                .map(|r| r.name),
            None => None,
        };
        Ok(AuthUser {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            active: u.active,
            role,
        })
    }
}

#[async_trait::async_trait]
impl AuthRepository for SeaOrmAuthRepository {
    async fn find_user_by_email(&self, email: &str) -> Result<Option<AuthUser>, AuthError> {
        let found = user::find_live_by_email(&self.db, email)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        match found {
            Some(u) => Ok(Some(self.to_auth_user(u).await?)),
            None => Ok(None),
        }
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<AuthUser>, AuthError> {
        let found = user::find_live_by_id(&self.db, id)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        match found {
            Some(u) => Ok(Some(self.to_auth_user(u).await?)),
            None => Ok(None),
        }
    }

    async fn get_credentials(&self, user_id: Uuid) -> Result<Option<Credentials>, AuthError> {
        let res = user_credentials::find_by_user(&self.db, user_id)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(res.map(|c| Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm }))
    }

    async fn upsert_password(&self, user_id: Uuid, password_hash: String, password_algorithm: String) -> Result<Credentials, AuthError> {
        let c = user_credentials::upsert_password(&self.db, user_id, password_hash, &password_algorithm)
            .await
            .map_err(|e| AuthError::Repository(e.to_string()))?;
        Ok(Credentials { user_id: c.user_id, password_hash: c.password_hash, password_algorithm: c.password_algorithm })
    }
}
