//! Authentication service: password hashing, JWT, registration, login, and profile.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::errors::AppError;
use crate::models::user::{CreateUser, UpdateProfile, User, UserResponse, UserRole};

/// Maximum failed login attempts before account lockout.
const MAX_FAILED_ATTEMPTS: i32 = 3;

/// Lockout duration in minutes after exceeding max failed attempts.
const LOCKOUT_DURATION_MINUTES: i64 = 30;

const ACCESS: &str = "access";
const REFRESH: &str = "refresh";

/// JWT claims embedded in access and refresh tokens.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub role: String,
    pub token_type: String,
    pub exp: i64,
    pub iat: i64,
}

/// Token pair returned on register, login, and refresh.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    /// Access token, under the name the web client stores.
    pub token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// Profile plus tokens, flattened into one object.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

/// Token lifetimes and signing secret, taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct TokenSettings<'a> {
    pub secret: &'a str,
    pub access_expiry_secs: i64,
    pub refresh_expiry_secs: i64,
}

impl<'a> From<&'a AppConfig> for TokenSettings<'a> {
    fn from(config: &'a AppConfig) -> Self {
        Self {
            secret: &config.jwt_secret,
            access_expiry_secs: config.jwt_access_token_expiry_secs,
            refresh_expiry_secs: config.jwt_refresh_token_expiry_secs,
        }
    }
}

/// Hash a plaintext password with argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {e}")))
}

/// Verify a plaintext password against a stored hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn claims_for(user: &User, token_type: &str, expiry_secs: i64) -> Claims {
    let now = Utc::now();
    Claims {
        sub: user.id.to_string(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
        token_type: token_type.to_string(),
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    }
}

/// Generate a JWT token pair (access + refresh).
pub fn generate_tokens(user: &User, settings: &TokenSettings<'_>) -> Result<TokenPair, AppError> {
    let encoding_key = EncodingKey::from_secret(settings.secret.as_bytes());
    let encode = |claims: &Claims| {
        jsonwebtoken::encode(&Header::default(), claims, &encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {e}")))
    };

    Ok(TokenPair {
        token: encode(&claims_for(user, ACCESS, settings.access_expiry_secs))?,
        refresh_token: encode(&claims_for(user, REFRESH, settings.refresh_expiry_secs))?,
        token_type: "Bearer".to_string(),
        expires_in: settings.access_expiry_secs,
    })
}

/// Validate a JWT and return the claims.
pub fn validate_token(token: &str, jwt_secret: &str) -> Result<Claims, AppError> {
    let decoding_key = DecodingKey::from_secret(jwt_secret.as_bytes());
    jsonwebtoken::decode::<Claims>(token, &decoding_key, &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::Unauthorized)
}

/// Validate an access token and return the user id, email, and role it carries.
pub fn authenticate_access_token(
    token: &str,
    jwt_secret: &str,
) -> Result<(Uuid, String, UserRole), AppError> {
    let claims = validate_token(token, jwt_secret)?;
    if claims.token_type != ACCESS {
        return Err(AppError::Unauthorized);
    }
    let user_id: Uuid = claims.sub.parse().map_err(|_| AppError::Unauthorized)?;
    let role = UserRole::parse(&claims.role).ok_or(AppError::Unauthorized)?;
    Ok((user_id, claims.email, role))
}

fn auth_response(user: User, settings: &TokenSettings<'_>) -> Result<AuthResponse, AppError> {
    let tokens = generate_tokens(&user, settings)?;
    Ok(AuthResponse {
        user: UserResponse::from(user),
        tokens,
    })
}

/// Insert a user with a hashed password.
pub async fn create_user(pool: &PgPool, input: &CreateUser) -> Result<User, AppError> {
    let password_hash = hash_password(&input.password)?;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email, password_hash, role)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(input.name.trim())
    .bind(input.email.trim().to_lowercase())
    .bind(&password_hash)
    .bind(input.role)
    .fetch_one(pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, "A user with this email already exists"))?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "User created");
    Ok(user)
}

/// Self-registration. New accounts are always agents.
pub async fn register(
    pool: &PgPool,
    name: &str,
    email: &str,
    password: &str,
    settings: &TokenSettings<'_>,
) -> Result<AuthResponse, AppError> {
    let user = create_user(
        pool,
        &CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: UserRole::Agent,
        },
    )
    .await?;
    auth_response(user, settings)
}

/// Authenticate by email and password. When `expected_role` is given the
/// account must hold that role.
pub async fn login(
    pool: &PgPool,
    email: &str,
    password: &str,
    expected_role: Option<UserRole>,
    settings: &TokenSettings<'_>,
) -> Result<AuthResponse, AppError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
        .bind(email.trim())
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if let Some(locked_until) = user.locked_until {
        if locked_until > Utc::now() {
            tracing::warn!(user_id = %user.id, "Login attempt on locked account");
            return Err(AppError::Unauthorized);
        }
    }

    if !user.is_active {
        tracing::warn!(user_id = %user.id, "Login attempt on deactivated account");
        return Err(AppError::Unauthorized);
    }

    if !verify_password(password, &user.password_hash)? {
        record_failed_attempt(pool, &user).await?;
        return Err(AppError::Unauthorized);
    }

    if let Some(role) = expected_role {
        if role != user.role {
            return Err(AppError::Forbidden(format!(
                "This account cannot sign in as {}",
                role.as_str()
            )));
        }
    }

    let user = sqlx::query_as::<_, User>(
        "UPDATE users SET failed_login_attempts = 0, locked_until = NULL, last_login = NOW() \
         WHERE id = $1 RETURNING *",
    )
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    auth_response(user, settings)
}

async fn record_failed_attempt(pool: &PgPool, user: &User) -> Result<(), AppError> {
    let attempts = user.failed_login_attempts + 1;
    let locked_until = (attempts >= MAX_FAILED_ATTEMPTS)
        .then(|| Utc::now() + Duration::minutes(LOCKOUT_DURATION_MINUTES));

    sqlx::query("UPDATE users SET failed_login_attempts = $1, locked_until = $2 WHERE id = $3")
        .bind(attempts)
        .bind(locked_until)
        .bind(user.id)
        .execute(pool)
        .await?;

    if locked_until.is_some() {
        tracing::warn!(user_id = %user.id, attempts, "Account locked after failed logins");
    }
    Ok(())
}

/// Exchange a valid refresh token for a new pair.
pub async fn refresh_token(
    pool: &PgPool,
    refresh_token_str: &str,
    settings: &TokenSettings<'_>,
) -> Result<TokenPair, AppError> {
    let claims = validate_token(refresh_token_str, settings.secret)?;
    if claims.token_type != REFRESH {
        return Err(AppError::Unauthorized);
    }

    let user_id: Uuid = claims.sub.parse().map_err(|_| AppError::Unauthorized)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1 AND is_active = true")
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::Unauthorized)?;

    generate_tokens(&user, settings)
}

/// Account state re-checked on every authenticated request.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionAccount {
    pub email: String,
    pub role: UserRole,
    pub is_active: bool,
}

/// Only existing, active accounts keep a session. Role and email come from
/// the account, not from the token.
pub fn active_session(account: Option<SessionAccount>) -> Result<SessionAccount, AppError> {
    match account {
        Some(account) if account.is_active => Ok(account),
        _ => Err(AppError::Unauthorized),
    }
}

/// Load the current account behind an access token.
pub async fn load_session(pool: &PgPool, id: Uuid) -> Result<SessionAccount, AppError> {
    let account = sqlx::query_as::<_, SessionAccount>(
        "SELECT email, role, is_active FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    active_session(account).map_err(|e| {
        tracing::warn!(user_id = %id, "Token presented for missing or deactivated account");
        e
    })
}

/// Find a user by ID.
pub async fn find_user_by_id(pool: &PgPool, id: Uuid) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}

/// Update the caller's own name and/or email.
pub async fn update_profile(
    pool: &PgPool,
    id: Uuid,
    input: &UpdateProfile,
) -> Result<User, AppError> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            updated_at = NOW()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(input.name.as_deref().map(str::trim))
    .bind(input.email.as_deref().map(|e| e.trim().to_lowercase()))
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::from_unique_violation(e, "A user with this email already exists"))?
    .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
