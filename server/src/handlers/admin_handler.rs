// JSON admin console: user list/search/filter and raw CRUD over role profiles.
use crate::{
    error::AppError,
    models::{
        profile::{Gender, ProfileDetails, Role, RoleProfile},
        user::{RoleFlags, User},
    },
    state::AppState,
    store::{
        profiles,
        users::{self, NewUser, UserFilter},
    },
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct CreateUserPayload {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password1: Option<String>,
    pub password2: Option<String>,
    pub is_admin: Option<bool>,
    pub is_student: Option<bool>,
    pub is_faculty: Option<bool>,
    pub is_interviewer: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateUserPayload {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_admin: Option<bool>,
    pub is_student: Option<bool>,
    pub is_faculty: Option<bool>,
    pub is_interviewer: Option<bool>,
}

#[derive(Deserialize)]
pub struct ProfilePayload {
    pub user_id: Option<Uuid>,
    pub gender: Option<Gender>,
    pub bio: Option<String>,
}

#[derive(Serialize)]
pub struct UserDetail {
    #[serde(flatten)]
    pub user: User,
    pub profiles: Vec<RoleProfile>,
}

fn parse_role(role: &str) -> Result<Role, AppError> {
    role.parse().map_err(|_| AppError::NotFound)
}

/// Builds role fields from a payload. Gender falls back to its default when
/// `gender_required` is false; a student bio is always required.
fn details_from(role: Role, payload: ProfilePayload, gender_required: bool) -> Result<ProfileDetails, AppError> {
    match role {
        Role::Student => {
            let bio = payload
                .bio
                .ok_or_else(|| AppError::Validation("bio is required for student profiles".to_string()))?;
            Ok(ProfileDetails::Student { bio })
        }
        _ => {
            let gender = match payload.gender {
                Some(g) => g,
                None if gender_required => {
                    return Err(AppError::Validation(format!("gender is required for {} profiles", role)));
                }
                None => Gender::default(),
            };
            profiles::gendered(role, gender).ok_or(AppError::InternalServerError)
        }
    }
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(users::list_users(&state.pool, &filter).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserPayload>,
) -> Result<(StatusCode, Json<User>), AppError> {
    if payload.password1 != payload.password2 {
        return Err(AppError::Validation("The two password fields didn't match.".to_string()));
    }

    let defaults = RoleFlags::default();
    let flags = RoleFlags {
        admin: payload.is_admin.unwrap_or(defaults.admin),
        student: payload.is_student.unwrap_or(defaults.student),
        faculty: payload.is_faculty.unwrap_or(defaults.faculty),
        interviewer: payload.is_interviewer.unwrap_or(defaults.interviewer),
    };

    let user = users::create_user(
        &state.pool,
        NewUser {
            email: &payload.email,
            first_name: &payload.first_name,
            last_name: &payload.last_name,
            password: payload.password1.as_deref(),
            flags,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserDetail>, AppError> {
    let user = users::find_by_id(&state.pool, id).await?.ok_or(AppError::NotFound)?;

    let mut found = Vec::new();
    for role in Role::ALL {
        if let Some(p) = profiles::find_profile_for_user(&state.pool, role, id).await? {
            found.push(p);
        }
    }

    Ok(Json(UserDetail { user, profiles: found }))
}

pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserPayload>,
) -> Result<Json<User>, AppError> {
    let mut user = users::find_by_id(&state.pool, id).await?.ok_or(AppError::NotFound)?;

    if let Some(v) = payload.first_name {
        user.first_name = v;
    }
    if let Some(v) = payload.last_name {
        user.last_name = v;
    }
    if let Some(v) = payload.is_active {
        user.is_active = v;
    }
    for (role, value) in [
        (Role::Admin, payload.is_admin),
        (Role::Student, payload.is_student),
        (Role::Faculty, payload.is_faculty),
        (Role::Interviewer, payload.is_interviewer),
    ] {
        if let Some(v) = value {
            user.set_flag(role, v);
        }
    }

    match payload.password.as_deref() {
        Some(pw) => users::set_password(&state.pool, &mut user, Some(pw)).await?,
        None => users::save_user(&state.pool, &mut user).await?,
    }

    Ok(Json(user))
}

pub async fn list_profiles(
    State(state): State<AppState>,
    Path(role): Path<String>,
) -> Result<Json<Vec<RoleProfile>>, AppError> {
    let role = parse_role(&role)?;
    Ok(Json(profiles::list_profiles(&state.pool, role).await?))
}

pub async fn create_profile(
    State(state): State<AppState>,
    Path(role): Path<String>,
    Json(payload): Json<ProfilePayload>,
) -> Result<(StatusCode, Json<RoleProfile>), AppError> {
    let role = parse_role(&role)?;
    let user_id = payload
        .user_id
        .ok_or_else(|| AppError::Validation("user_id is required".to_string()))?;
    users::find_by_id(&state.pool, user_id).await?.ok_or(AppError::NotFound)?;

    let details = details_from(role, payload, false)?;
    let profile = profiles::create_profile_with(&state.pool, user_id, details).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

pub async fn update_profile(
    State(state): State<AppState>,
    Path((role, id)): Path<(String, Uuid)>,
    Json(payload): Json<ProfilePayload>,
) -> Result<Json<RoleProfile>, AppError> {
    let role = parse_role(&role)?;
    let details = details_from(role, payload, true)?;
    Ok(Json(profiles::update_profile(&state.pool, id, details).await?))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path((role, id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    let role = parse_role(&role)?;
    if !user.has_perm(&format!("accounts.delete_{}", role)) {
        return Err(AppError::Forbidden);
    }
    profiles::delete_profile(&state.pool, role, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
