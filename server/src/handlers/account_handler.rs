use crate::{
    auth::{self, LOGIN_URL, SESSION_COOKIE},
    error::AppError,
    state::AppState,
    store::users,
    templates,
};
use axum::{
    extract::{Query, State},
    http::{header, HeaderMap},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tower_cookies::{Cookie, Cookies};

#[derive(Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    pub next: Option<String>,
}

/// Only same-site relative paths are followed after login.
fn safe_next<'a>(next: Option<&'a str>, default: &'a str) -> &'a str {
    match next {
        Some(n) if n.starts_with('/') && !n.starts_with("//") && !n.contains('\\') => n,
        _ => default,
    }
}

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())
}

pub async fn login_page(
    State(state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    Query(query): Query<LoginQuery>,
) -> Result<Response, AppError> {
    if auth::current_user(&state, &cookies, bearer(&headers)).await?.is_some() {
        let target = safe_next(query.next.as_deref(), &state.config.login_redirect_url);
        return Ok(Redirect::to(target).into_response());
    }

    Ok(Html(templates::login_page(None, "", query.next.as_deref())).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = match users::authenticate(&state.pool, &form.email, &form.password).await {
        Ok(user) => user,
        Err(AppError::InvalidCredentials) => {
            tracing::info!("Failed login for {:?}", form.email);
            let html = templates::login_page(
                Some("Please enter a correct email and password."),
                &form.email,
                form.next.as_deref(),
            );
            return Ok(Html(html).into_response());
        }
        Err(e) => return Err(e),
    };

    let token = auth::issue_token(&user, &state.config.jwt_secret, state.config.session_ttl_hours)?;
    cookies.add(auth::session_cookie(token));
    tracing::info!("User {} logged in", user.email);

    let target = safe_next(form.next.as_deref(), &state.config.login_redirect_url);
    Ok(Redirect::to(target).into_response())
}

pub async fn logout(cookies: Cookies) -> Redirect {
    cookies.remove(Cookie::build((SESSION_COOKIE, "")).path("/").into());
    Redirect::to(LOGIN_URL)
}

#[cfg(test)]
mod tests {
    use super::safe_next;

    #[test]
    fn next_must_be_local_path() {
        assert_eq!(safe_next(Some("/index/"), "/d/"), "/index/");
        assert_eq!(safe_next(Some("//evil.com/"), "/d/"), "/d/");
        assert_eq!(safe_next(Some("https://evil.com/"), "/d/"), "/d/");
        assert_eq!(safe_next(Some("/\\evil.com"), "/d/"), "/d/");
        assert_eq!(safe_next(None, "/d/"), "/d/");
    }
}
