use std::sync::Arc;

use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader, Validation};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::domain::{AuthSession, AuthUser, Claims, LoginInput};
use super::errors::AuthError;
use super::password;
use super::repository::AuthRepository;

/// Auth service configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub token_ttl_secs: i64,
    pub password_algorithm: String,
}

impl AuthConfig {
    pub fn new(jwt_secret: impl Into<String>, token_ttl_secs: i64) -> Self {
        Self { jwt_secret: jwt_secret.into(), token_ttl_secs, password_algorithm: password::ALGORITHM.into() }
    }
}

/// Auth business service independent of web framework
pub struct AuthService<R: AuthRepository> {
    repo: Arc<R>,
    cfg: AuthConfig,
}

impl<R: AuthRepository> AuthService<R> {
    pub fn new(repo: Arc<R>, cfg: AuthConfig) -> Self { Self { repo, cfg } }

    /// Hash and store a password for an existing user.
    #[instrument(skip(self, plain))]
    pub async fn set_password(&self, user_id: Uuid, plain: &str) -> Result<(), AuthError> {
        let hash = password::hash_password(plain)?;
        self.repo.upsert_password(user_id, hash, self.cfg.password_algorithm.clone()).await?;
        Ok(())
    }

    /// Authenticate a user and issue a token.
    ///
    /// # Examples
    /// ```
    /// use service::auth::{AuthService, AuthConfig, repository::mock::MockAuthRepository};
    /// use service::auth::domain::{AuthUser, LoginInput};
    /// use std::sync::Arc;
    /// let repo = Arc::new(MockAuthRepository::default());
    /// let svc = AuthService::new(repo.clone(), AuthConfig::new("secret", 3600));
    /// let user = repo.insert_user(AuthUser {
    ///     id: uuid::Uuid::new_v4(), email: "u@e.com".into(), first_name: "Uma".into(),
    ///     last_name: "Ray".into(), active: true, role: Some("admin".into()),
    /// });
    /// tokio_test::block_on(svc.set_password(user.id, "Passw0rd")).unwrap();
    /// let session = tokio_test::block_on(svc.login(LoginInput { email: "U@E.com".into(), password: "Passw0rd".into() })).unwrap();
    /// assert_eq!(session.user.id, user.id);
    /// assert!(!session.token.is_empty());
    /// ```
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub async fn login(&self, input: LoginInput) -> Result<AuthSession, AuthError> {
        let email = input.email.trim().to_lowercase();
        if !looks_like_email(&email) {
            return Err(AuthError::Validation("Invalid email format".into()));
        }
        if input.password.is_empty() {
            return Err(AuthError::Validation("Password is required".into()));
        }

        let user = self.repo.find_user_by_email(&email).await?.ok_or(AuthError::EmailNotFound)?;
        let cred = self.repo.get_credentials(user.id).await?.ok_or(AuthError::PasswordNotSet)?;

        // an unreadable stored hash counts as a mismatch
        let matched = password::verify_password(&input.password, &cred.password_hash).unwrap_or_else(|e| {
            warn!(user_id = %user.id, error = %e, "stored password hash could not be parsed");
            false
        });
        if !matched {
            debug!(user_id = %user.id, "password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        if !user.active {
            warn!(user_id = %user.id, "login attempt on inactive account");
            return Err(AuthError::Inactive);
        }

        let token = self.issue_token(user.id)?;
        info!(user_id = %user.id, "user_logged_in");
        Ok(AuthSession { user, token })
    }

    /// HS256 token with `sub = user_id` valid for the configured TTL.
    pub fn issue_token(&self, user_id: Uuid) -> Result<String, AuthError> {
        let iat = chrono::Utc::now().timestamp();
        let claims = Claims { sub: user_id.to_string(), iat, exp: iat + self.cfg.token_ttl_secs, nbf: None };
        self.encode_claims(&claims)
    }

    pub fn encode_claims(&self, claims: &Claims) -> Result<String, AuthError> {
        encode(&JwtHeader::new(Algorithm::HS256), claims, &EncodingKey::from_secret(self.cfg.jwt_secret.as_bytes()))
            .map_err(|e| AuthError::TokenError(e.to_string()))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_nbf = true;
        decode::<Claims>(token, &DecodingKey::from_secret(self.cfg.jwt_secret.as_bytes()), &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                ErrorKind::ImmatureSignature => AuthError::TokenImmature,
                _ => AuthError::TokenInvalid,
            })
    }

    /// Verify `token` and load the live user it names.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, token: &str) -> Result<AuthUser, AuthError> {
        let claims = self.verify_token(token)?;
        let id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::TokenInvalid)?;
        self.repo.find_user_by_id(id).await?.ok_or(AuthError::UserNotFound)
    }
}

fn looks_like_email(s: &str) -> bool {
    models::user::validate_email(s).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repository::mock::MockAuthRepository;

    fn setup(active: bool) -> (Arc<MockAuthRepository>, AuthService<MockAuthRepository>, AuthUser) {
        let repo = Arc::new(MockAuthRepository::default());
        let svc = AuthService::new(repo.clone(), AuthConfig::new("test-secret", 3600));
        let user = repo.insert_user(AuthUser {
            id: Uuid::new_v4(),
            email: "Ann@Example.com".into(),
            first_name: "Ann".into(),
            last_name: "Lee".into(),
            active,
            role: Some("user".into()),
        });
        (repo, svc, user)
    }

    fn login(email: &str, password: &str) -> LoginInput {
        LoginInput { email: email.into(), password: password.into() }
    }

    #[tokio::test]
    async fn login_happy_path_issues_verifiable_token() {
        let (_repo, svc, user) = setup(true);
        svc.set_password(user.id, "Secret123").await.unwrap();
        let session = svc.login(login(" ANN@example.com ", "Secret123")).await.unwrap();
        let claims = svc.verify_token(&session.token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.exp - claims.iat, 3600);
        assert_eq!(svc.authenticate(&session.token).await.unwrap().id, user.id);
    }

    #[tokio::test]
    async fn login_failures_map_to_distinct_errors() {
        let (_repo, svc, user) = setup(true);
        assert!(matches!(svc.login(login("bad", "x")).await, Err(AuthError::Validation(_))));
        assert!(matches!(svc.login(login("ann@example.com", "")).await, Err(AuthError::Validation(_))));
        assert!(matches!(svc.login(login("nobody@example.com", "x")).await, Err(AuthError::EmailNotFound)));
        assert!(matches!(svc.login(login("ann@example.com", "x")).await, Err(AuthError::PasswordNotSet)));
        svc.set_password(user.id, "Secret123").await.unwrap();
        assert!(matches!(svc.login(login("ann@example.com", "nope")).await, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn corrupt_stored_hash_is_invalid_credentials() {
        let (repo, svc, user) = setup(true);
        repo.upsert_password(user.id, "not-a-phc-string".into(), password::ALGORITHM.into()).await.unwrap();
        assert!(matches!(svc.login(login("ann@example.com", "Secret123")).await, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn inactive_account_is_rejected_after_password_check() {
        let (_repo, svc, user) = setup(false);
        svc.set_password(user.id, "Secret123").await.unwrap();
        assert!(matches!(svc.login(login("ann@example.com", "Secret123")).await, Err(AuthError::Inactive)));
    }

    #[tokio::test]
    async fn token_verification_errors() {
        let (repo, svc, user) = setup(true);
        let now = chrono::Utc::now().timestamp();

        let expired = svc.encode_claims(&Claims { sub: user.id.to_string(), iat: now - 7200, exp: now - 3600, nbf: None }).unwrap();
        assert!(matches!(svc.verify_token(&expired), Err(AuthError::TokenExpired)));

        let immature = svc.encode_claims(&Claims { sub: user.id.to_string(), iat: now, exp: now + 7200, nbf: Some(now + 3600) }).unwrap();
        assert!(matches!(svc.verify_token(&immature), Err(AuthError::TokenImmature)));

        assert!(matches!(svc.verify_token("garbage"), Err(AuthError::TokenInvalid)));
        let other = AuthService::new(repo.clone(), AuthConfig::new("other-secret", 3600));
        let foreign = other.issue_token(user.id).unwrap();
        assert!(matches!(svc.verify_token(&foreign), Err(AuthError::TokenInvalid)));

        let token = svc.issue_token(user.id).unwrap();
        repo.remove_user(user.id);
        assert!(matches!(svc.authenticate(&token).await, Err(AuthError::UserNotFound)));
    }
}
