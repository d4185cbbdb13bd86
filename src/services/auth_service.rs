use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    models::{AuthResponse, LoginRequest, RegisterRequest, Role, User, UserInfo},
    state::AppState,
    utils::error::{AppError, AppResult},
};

const MIN_PASSWORD_LEN: usize = 6;

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // user id
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
}

/// Verified identity of the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityClaim {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl IdentityClaim {
    pub fn is_admin(&self) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Member => false,
        }
    }
}

/// Per-request caller context. `identity` is `None` for anonymous requests.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    pub identity: Option<IdentityClaim>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(identity: IdentityClaim) -> Self {
        Self {
            identity: Some(identity),
        }
    }
}

// ==================== IDENTITY GATE ====================

pub fn generate_token(config: &AppConfig, user: &User) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
        iat: now.timestamp() as usize,
        exp: (now + Duration::hours(config.token_ttl_hours)).timestamp() as usize,
        iss: config.jwt_issuer.clone(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to generate token: {}", e)))
}

/// Any verification failure (malformed, expired, bad signature, wrong issuer) yields `None`.
pub fn resolve_identity(config: &AppConfig, token: &str) -> Option<IdentityClaim> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[config.jwt_issuer.as_str()]);

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Some(IdentityClaim {
            id: data.claims.sub,
            email: data.claims.email,
            role: data.claims.role,
        }),
        Err(e) => {
            log::debug!("🔒 Rejected token: {}", e);
            None
        }
    }
}

pub fn require_identity(caller: &Caller) -> AppResult<&IdentityClaim> {
    caller.identity.as_ref().ok_or_else(AppError::unauthenticated)
}

pub fn require_admin(caller: &Caller) -> AppResult<&IdentityClaim> {
    let identity = require_identity(caller)?;
    match identity.role {
        Role::Admin => Ok(identity),
        Role::Member => Err(AppError::admin_only()),
    }
}

// ==================== ACCOUNTS ====================

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub async fn register(state: &AppState, request: &RegisterRequest) -> AppResult<AuthResponse> {
    let name = request.name.trim();
    let email = normalize_email(&request.email);

    if name.is_empty() {
        return Err(AppError::InvalidInput("Name is required".to_string()));
    }
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::InvalidInput("A valid email is required".to_string()));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::InvalidInput(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }

    if state.store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("Email already in use".to_string()));
    }

    let password = hash(&request.password, state.config.bcrypt_cost)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;

    let user = User {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        email,
        password,
        role: Role::Member,
        created_at: Utc::now(),
    };

    state.store.insert_user(&user).await?;
    log::info!("👤 Registered user {} ({})", user.id, user.email);

    let token = generate_token(&state.config, &user)?;
    Ok(AuthResponse {
        success: true,
        token,
        user: UserInfo::from(user),
    })
}

pub async fn login(state: &AppState, request: &LoginRequest) -> AppResult<AuthResponse> {
    let invalid = || AppError::Unauthenticated("Invalid email or password".to_string());

    let user = state
        .store
        .find_user_by_email(&normalize_email(&request.email))
        .await?
        .ok_or_else(invalid)?;

    let valid = verify(&request.password, &user.password)
        .map_err(|e| AppError::Internal(format!("Password verification error: {}", e)))?;
    if !valid {
        return Err(invalid());
    }

    let token = generate_token(&state.config, &user)?;
    Ok(AuthResponse {
        success: true,
        token,
        user: UserInfo::from(user),
    })
}

pub async fn me(state: &AppState, caller: &Caller) -> AppResult<UserInfo> {
    let identity = require_identity(caller)?;
    state
        .store
        .find_user_by_id(&identity.id)
        .await?
        .map(UserInfo::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

pub async fn list_users(state: &AppState, caller: &Caller) -> AppResult<Vec<UserInfo>> {
    require_admin(caller)?;
    let users = state.store.list_users().await?;
    Ok(users.into_iter().map(UserInfo::from).collect())
}

pub async fn get_user(state: &AppState, caller: &Caller, id: &str) -> AppResult<UserInfo> {
    require_admin(caller)?;
    state
        .store
        .find_user_by_id(id)
        .await?
        .map(UserInfo::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{admin, member, test_state};

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            name: "Ada".to_string(),
            email: email.to_string(),
            password: "s3cret-pass".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login_round_trip() {
        let state = test_state();
        let registered = register(&state, &register_request("  Ada@Example.com ")).await.unwrap();
        assert_eq!(registered.user.email, "ada@example.com");
        assert_eq!(registered.user.role, Role::Member);

        let logged_in = login(
            &state,
            &LoginRequest {
                email: "ada@example.com".to_string(),
                password: "s3cret-pass".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);

        let identity = resolve_identity(&state.config, &logged_in.token).unwrap();
        assert_eq!(identity.id, registered.user.id);
        assert_eq!(identity.role, Role::Member);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts() {
        let state = test_state();
        register(&state, &register_request("ada@example.com")).await.unwrap();
        let err = register(&state, &register_request("ADA@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let state = test_state();
        let mut request = register_request("ada@example.com");
        request.password = "123".to_string();
        assert!(matches!(
            register(&state, &request).await,
            Err(AppError::InvalidInput(_))
        ));

        let mut request = register_request("not-an-email");
        request.name = "Ada".to_string();
        assert!(matches!(
            register(&state, &request).await,
            Err(AppError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn wrong_password_is_unauthenticated() {
        let state = test_state();
        register(&state, &register_request("ada@example.com")).await.unwrap();

        let err = login(
            &state,
            &LoginRequest {
                email: "ada@example.com".to_string(),
                password: "wrong-pass".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));

        let err = login(
            &state,
            &LoginRequest {
                email: "nobody@example.com".to_string(),
                password: "whatever".to_string(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Unauthenticated(_)));
    }

    #[test]
    fn resolve_identity_rejects_bad_tokens() {
        let config = AppConfig::for_tests();
        assert!(resolve_identity(&config, "").is_none());
        assert!(resolve_identity(&config, "not.a.jwt").is_none());

        let user = User {
            id: "u1".to_string(),
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password: String::new(),
            role: Role::Admin,
            created_at: Utc::now(),
        };
        let token = generate_token(&config, &user).unwrap();
        assert_eq!(resolve_identity(&config, &token).unwrap().role, Role::Admin);

        let mut other = AppConfig::for_tests();
        other.jwt_secret = "another-secret".to_string();
        assert!(resolve_identity(&other, &token).is_none());

        let mut expired = AppConfig::for_tests();
        expired.token_ttl_hours = -2;
        let stale = generate_token(&expired, &user).unwrap();
        assert!(resolve_identity(&config, &stale).is_none());
    }

    #[test]
    fn guards() {
        let anonymous = Caller::anonymous();
        assert!(matches!(require_identity(&anonymous), Err(AppError::Unauthenticated(_))));
        assert!(matches!(require_admin(&anonymous), Err(AppError::Unauthenticated(_))));

        let member = member("m1");
        assert!(require_identity(&member).is_ok());
        assert!(matches!(require_admin(&member), Err(AppError::Forbidden(_))));

        assert!(require_admin(&admin("a1")).is_ok());
    }

    #[tokio::test]
    async fn user_queries_are_admin_only() {
        let state = test_state();
        let registered = register(&state, &register_request("ada@example.com")).await.unwrap();
        let id = registered.user.id.clone();

        assert!(matches!(
            list_users(&state, &member(&id)).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(list_users(&state, &admin("a1")).await.unwrap().len(), 1);
        assert_eq!(get_user(&state, &admin("a1"), &id).await.unwrap().email, "ada@example.com");
        assert!(matches!(
            get_user(&state, &admin("a1"), "missing").await,
            Err(AppError::NotFound(_))
        ));

        let caller = Caller::authenticated(resolve_identity(&state.config, &registered.token).unwrap());
        assert_eq!(me(&state, &caller).await.unwrap().id, id);
        assert!(matches!(me(&state, &Caller::anonymous()).await, Err(AppError::Unauthenticated(_))));
    }
}
