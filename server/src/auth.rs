use crate::{error::AppError, models::user::User, state::AppState, store::users};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    body::Body,
    extract::{OriginalUri, State},
    http::{header, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tower_cookies::{Cookie, Cookies};
use url::form_urlencoded;
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "sessionid";
pub const LOGIN_URL: &str = "/login/";

/// Prefix marking a password hash that can never verify.
const UNUSABLE_PASSWORD_PREFIX: char = '!';

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub exp: i64,
}

/// Hashes `password` with argon2 off the async executor. `None` produces an
/// unusable hash, for accounts that must not log in with a password.
pub async fn hash_password(password: Option<&str>) -> Result<String, AppError> {
    let Some(password) = password else {
        return Ok(format!("{}{}", UNUSABLE_PASSWORD_PREFIX, Uuid::new_v4().simple()));
    };

    let password = password.to_owned();
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
    })
    .await
    .map_err(|_| AppError::InternalServerError)?
    .map_err(AppError::PasswordHashError)
}

pub async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    if password_hash.starts_with(UNUSABLE_PASSWORD_PREFIX) {
        return Ok(false);
    }

    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let is_valid = tokio::task::spawn_blocking(move || {
        let parsed_hash = argon2::PasswordHash::new(&password_hash)?;
        Argon2::default().verify_password(password.as_bytes(), &parsed_hash)
    })
    .await
    .map_err(|_| AppError::InternalServerError)?;

    Ok(is_valid.is_ok())
}

pub fn issue_token(user: &User, secret: &str, ttl_hours: i64) -> Result<String, AppError> {
    let exp = Duration::try_hours(ttl_hours)
        .filter(|ttl| *ttl > Duration::zero())
        .and_then(|ttl| Utc::now().checked_add_signed(ttl))
        .ok_or_else(|| {
            tracing::error!("Session lifetime of {} hours is out of range", ttl_hours);
            AppError::InternalServerError
        })?;

    let claims = Claims {
        sub: user.id,
        email: user.email.clone(),
        exp: exp.timestamp(),
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    Ok(decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?
    .claims)
}

pub fn session_cookie(token: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_path("/");
    cookie
}

/// Resolves the logged-in user from the session cookie, falling back to an
/// `Authorization: Bearer` header. Inactive or deleted accounts count as
/// anonymous.
pub async fn current_user(
    state: &AppState,
    cookies: &Cookies,
    req_auth_header: Option<&str>,
) -> Result<Option<User>, AppError> {
    let token = match cookies.get(SESSION_COOKIE) {
        Some(cookie) => cookie.value().to_owned(),
        None => match req_auth_header.and_then(|v| v.strip_prefix("Bearer ")) {
            Some(token) => token.to_owned(),
            None => return Ok(None),
        },
    };

    let claims = match decode_token(&token, &state.config.jwt_secret) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::debug!("Rejecting session token: {}", e);
            return Ok(None);
        }
    };

    let user = users::find_by_id(&state.pool, claims.sub).await?;
    Ok(user.filter(|u| u.is_active))
}

/// `/login/?next=<full_path>` with `next` form-encoded; `/` stays literal.
pub fn login_redirect_target(full_path: &str) -> String {
    let next: String = form_urlencoded::byte_serialize(full_path.as_bytes()).collect();
    format!("{}?next={}", LOGIN_URL, next.replace("%2F", "/"))
}

/// Login-required guard. Anonymous requests are redirected to the login page
/// with the original path in `next`.
pub async fn require_login(
    State(state): State<AppState>,
    cookies: Cookies,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    let Some(user) = current_user(&state, &cookies, auth_header.as_deref()).await? else {
        // nested routers see a stripped uri
        let uri = req
            .extensions()
            .get::<OriginalUri>()
            .map(|original| &original.0)
            .unwrap_or_else(|| req.uri());
        let full_path = uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or_else(|| uri.path());
        return Ok(Redirect::to(&login_redirect_target(full_path)).into_response());
    };

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Staff-only guard; must run after [`require_login`].
pub async fn require_staff(req: Request<Body>, next: Next) -> Result<Response, AppError> {
    let user = req.extensions().get::<User>().ok_or(AppError::Unauthorized)?;
    if !user.is_staff() || !user.has_module_perms("accounts") {
        tracing::warn!("Non-staff user {} tried to reach {}", user.email, req.uri().path());
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}
