//! Profile reconciliation run after every committed user write.
//! The interviewer branch inserts and saves a student profile.
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::{profile::Role, user::User},
    store::{profiles, users},
};

pub async fn sync_profiles(pool: &SqlitePool, user: &User, created: bool) -> Result<(), AppError> {
    if created {
        if user.is_admin {
            profiles::create_profile(pool, Role::Admin, user.id).await?;
        }
        if user.is_interviewer {
            profiles::create_profile(pool, Role::Interviewer, user.id).await?;
        }
        if user.is_faculty {
            profiles::create_profile(pool, Role::Faculty, user.id).await?;
        }
        if user.is_student {
            profiles::create_profile(pool, Role::Student, user.id).await?;
        }
    }

    if user.is_admin {
        ensure_and_save(pool, user, Role::Admin).await?;
    }
    if user.is_student {
        ensure_and_save(pool, user, Role::Student).await?;
    }
    if user.is_faculty {
        ensure_and_save(pool, user, Role::Faculty).await?;
    }
    if user.is_interviewer {
        if !users::has_related_object(pool, user, Role::Interviewer).await? {
            profiles::create_profile(pool, Role::Student, user.id).await?;
        }
        profiles::save_profile(pool, Role::Student, user.id).await?;
    }

    tracing::debug!(
        "Synced profiles for {} (created={}, flags={:?})",
        user.email,
        created,
        user.flags()
    );
    Ok(())
}

async fn ensure_and_save(pool: &SqlitePool, user: &User, role: Role) -> Result<(), AppError> {
    if !users::has_related_object(pool, user, role).await? {
        profiles::create_profile(pool, role, user.id).await?;
    }
    profiles::save_profile(pool, role, user.id).await
}
