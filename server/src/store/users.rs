use chrono::Utc;
use serde::Deserialize;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    auth,
    error::AppError,
    models::{
        profile::Role,
        user::{normalize_email, RoleFlags, User},
    },
    store::profiles,
    sync,
};

const USER_COLUMNS: &str = "id, email, first_name, last_name, password_hash, is_active, \
    is_admin, is_student, is_interviewer, is_faculty, created_at, updated_at";

pub struct NewUser<'a> {
    pub email: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub password: Option<&'a str>,
    pub flags: RoleFlags,
}

/// Admin console list filter. Every field is optional.
#[derive(Debug, Default, Deserialize)]
pub struct UserFilter {
    pub search: Option<String>,
    pub is_admin: Option<bool>,
    pub is_student: Option<bool>,
    pub is_faculty: Option<bool>,
    pub is_interviewer: Option<bool>,
}

/// Creates an account and its initial role profiles.
///
/// Rejects an empty email before anything is written. The user row is
/// committed before the synchronizer runs, so a profile failure leaves the
/// user in place and is returned to the caller.
pub async fn create_user(pool: &SqlitePool, new: NewUser<'_>) -> Result<User, AppError> {
    if new.email.trim().is_empty() {
        return Err(AppError::Validation("User must have an email address".to_string()));
    }

    let password_hash = auth::hash_password(new.password).await?;
    let now = Utc::now();

    let user = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (id, email, first_name, last_name, password_hash, \
             is_admin, is_student, is_interviewer, is_faculty, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         RETURNING {}",
        USER_COLUMNS
    ))
    .bind(Uuid::new_v4())
    .bind(normalize_email(new.email))
    .bind(new.first_name)
    .bind(new.last_name)
    .bind(password_hash)
    .bind(new.flags.admin)
    .bind(new.flags.student)
    .bind(new.flags.interviewer)
    .bind(new.flags.faculty)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await?;

    tracing::info!("Created user {} ({})", user.email, user.id);

    sync::sync_profiles(pool, &user, true).await?;
    Ok(user)
}

pub async fn create_superuser(
    pool: &SqlitePool,
    email: &str,
    first_name: &str,
    last_name: &str,
    password: Option<&str>,
) -> Result<User, AppError> {
    create_user(
        pool,
        NewUser {
            email,
            first_name,
            last_name,
            password,
            flags: RoleFlags::superuser(),
        },
    )
    .await
}

/// Persists every mutable field of `user`, then reconciles its profiles.
pub async fn save_user(pool: &SqlitePool, user: &mut User) -> Result<(), AppError> {
    user.updated_at = Utc::now();

    let res = sqlx::query(
        "UPDATE users SET email = ?, first_name = ?, last_name = ?, password_hash = ?, \
             is_active = ?, is_admin = ?, is_student = ?, is_interviewer = ?, is_faculty = ?, \
             updated_at = ? \
         WHERE id = ?",
    )
    .bind(&user.email)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.password_hash)
    .bind(user.is_active)
    .bind(user.is_admin)
    .bind(user.is_student)
    .bind(user.is_interviewer)
    .bind(user.is_faculty)
    .bind(user.updated_at)
    .bind(user.id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }
    tracing::debug!("Saved user {}", user.email);

    sync::sync_profiles(pool, user, false).await
}

pub async fn set_password(
    pool: &SqlitePool,
    user: &mut User,
    password: Option<&str>,
) -> Result<(), AppError> {
    user.password_hash = auth::hash_password(password).await?;
    save_user(pool, user).await
}

pub async fn has_related_object(
    pool: &SqlitePool,
    user: &User,
    role: Role,
) -> Result<bool, AppError> {
    profiles::profile_exists(pool, role, user.id).await
}

pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, AppError> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

/// Escapes LIKE wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub async fn list_users(pool: &SqlitePool, filter: &UserFilter) -> Result<Vec<User>, AppError> {
    let mut qb: QueryBuilder<Sqlite> =
        QueryBuilder::new(format!("SELECT {} FROM users WHERE 1 = 1", USER_COLUMNS));

    if let Some(search) = filter.search.as_deref().filter(|s| !s.is_empty()) {
        qb.push(" AND lower(email) LIKE ")
            .push_bind(format!("%{}%", escape_like(&search.to_lowercase())))
            .push(" ESCAPE '\\'");
    }
    for (column, value) in [
        ("is_admin", filter.is_admin),
        ("is_student", filter.is_student),
        ("is_faculty", filter.is_faculty),
        ("is_interviewer", filter.is_interviewer),
    ] {
        if let Some(value) = value {
            qb.push(format!(" AND {} = ", column)).push_bind(value);
        }
    }
    qb.push(" ORDER BY email, id");

    let users = qb.build_query_as::<User>().fetch_all(pool).await?;
    Ok(users)
}

/// Returns the account only when it exists, is active and `password` matches.
pub async fn authenticate(
    pool: &SqlitePool,
    email: &str,
    password: &str,
) -> Result<User, AppError> {
    let user = find_by_email(pool, email)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !auth::verify_password(password, &user.password_hash).await? {
        return Err(AppError::InvalidCredentials);
    }
    if !user.is_active {
        tracing::info!("Login attempt for inactive user {}", user.email);
        return Err(AppError::InvalidCredentials);
    }
    Ok(user)
}

#[cfg(test)]
pub(crate) async fn make_user(pool: &SqlitePool, email: &str, flags: RoleFlags) -> User {
    create_user(
        pool,
        NewUser {
            email,
            first_name: "Test",
            last_name: "User",
            password: Some("password"),
            flags,
        },
    )
    .await
    .expect("create user")
}
