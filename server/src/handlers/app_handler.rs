use crate::models::user::User;
use axum::Extension;

// Reached only through `auth::require_login`.
pub async fn index(Extension(user): Extension<User>) -> &'static str {
    tracing::debug!("Index served to {}", user.email);
    "Thanks for login"
}
