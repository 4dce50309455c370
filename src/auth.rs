use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use log::{info, warn};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::models::{PublicUser, Role, User};
use crate::store::UserStore;

/// Token payload. Carries enough identity that protected routes never
/// touch the users collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub name: String,
    pub iat: usize,
    pub exp: usize,
}

/// The authenticated caller, attached to the request by the middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub name: String,
}

impl From<Claims> for Identity {
    fn from(c: Claims) -> Self {
        Self {
            id: c.id,
            email: c.email,
            role: c.role,
            name: c.name,
        }
    }
}

#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn sign(&self, user: &User) -> ApiResult<String> {
        let now = Utc::now();
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| ApiError::Internal(format!("token lifetime {} overflows", self.ttl)))?;
        let claims = Claims {
            id: user.id.clone(),
            email: user.email.clone(),
            role: user.role,
            name: user.name.clone(),
            iat: now.timestamp() as usize,
            exp: expires.timestamp() as usize,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Checks the signature and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trims and treats empty strings as missing.
fn required(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

async fn hash_password(plain: &str, cost: u32) -> ApiResult<String> {
    let plain = plain.to_owned();
    Ok(tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost)).await??)
}

async fn verify_password(plain: &str, hash: &str) -> ApiResult<bool> {
    let (plain, hash) = (plain.to_owned(), hash.to_owned());
    Ok(tokio::task::spawn_blocking(move || bcrypt::verify(plain, &hash)).await??)
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: PublicUser,
}

const BAD_CREDENTIALS: &str = "Invalid email or password";

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserStore>,
    keys: TokenKeys,
    bcrypt_cost: u32,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, keys: TokenKeys, bcrypt_cost: u32) -> Self {
        Self {
            users,
            keys,
            bcrypt_cost,
        }
    }

    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    pub async fn register(&self, req: RegisterRequest) -> ApiResult<AuthSession> {
        let password = req.password.as_deref().filter(|p| !p.is_empty());
        let (Some(email), Some(password), Some(name)) =
            (required(&req.email), password, required(&req.name))
        else {
            return Err(ApiError::Validation(
                "Email, password, and name are required".to_string(),
            ));
        };
        let email = email.to_lowercase();
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("Invalid email address".to_string()));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            warn!("Registration rejected, email already exists: {}", email);
            return Err(ApiError::Conflict("Email already exists".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4().to_string(),
            email,
            password_hash: hash_password(password, self.bcrypt_cost).await?,
            name: name.to_string(),
            role: Role::Customer,
            created_at: now,
            updated_at: now,
        };
        // a concurrent registration can still win the race; the unique
        // index turns that into a Duplicate -> Conflict
        self.users.insert(&user).await?;

        info!("User registered: {} ({})", user.id, user.email);
        Ok(AuthSession {
            token: self.keys.sign(&user)?,
            user: PublicUser::from(&user),
        })
    }

    pub async fn login(&self, req: LoginRequest) -> ApiResult<AuthSession> {
        let password = req.password.as_deref().filter(|p| !p.is_empty());
        let (Some(email), Some(password)) = (required(&req.email), password) else {
            return Err(ApiError::Validation(
                "Email and password are required".to_string(),
            ));
        };
        let email = email.to_lowercase();

        let Some(user) = self.users.find_by_email(&email).await? else {
            warn!("Login failed, unknown email: {}", email);
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        };
        if !verify_password(password, &user.password_hash).await? {
            warn!("Login failed, wrong password for: {}", email);
            return Err(ApiError::Unauthorized(BAD_CREDENTIALS.to_string()));
        }

        info!("User logged in: {}", user.id);
        Ok(AuthSession {
            token: self.keys.sign(&user)?,
            user: PublicUser::from(&user),
        })
    }

    /// Tokens are not tracked server-side, so there is nothing to revoke.
    /// The token stays valid until it expires.
    pub fn logout(&self) -> &'static str {
        "Logout successful"
    }
}

// POST /api/auth/register
pub async fn register(
    data: web::Data<AppState>,
    body: web::Json<RegisterRequest>,
) -> ApiResult<HttpResponse> {
    let session = data.auth.register(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Registration successful",
        "token": session.token,
        "user": session.user,
    })))
}

// POST /api/auth/login
pub async fn login(
    data: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> ApiResult<HttpResponse> {
    let session = data.auth.login(body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Login successful",
        "token": session.token,
        "user": session.user,
    })))
}

// POST /api/auth/logout
pub async fn logout(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "message": data.auth.logout() }))
}
