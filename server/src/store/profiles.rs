use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::profile::{Gender, GenderedRow, ProfileDetails, Role, RoleProfile, StudentRow},
    store::users,
};

/// Inserts a profile with default field values. Fails on the UNIQUE
/// `user_id` constraint if the user already has one of this role.
pub async fn create_profile(pool: &SqlitePool, role: Role, user_id: Uuid) -> Result<RoleProfile, AppError> {
    create_profile_with(pool, user_id, ProfileDetails::default_for(role)).await
}

pub async fn create_profile_with(
    pool: &SqlitePool,
    user_id: Uuid,
    details: ProfileDetails,
) -> Result<RoleProfile, AppError> {
    let role = details.role();
    let id = Uuid::new_v4();

    match &details {
        ProfileDetails::Student { bio } => {
            sqlx::query("INSERT INTO student_profiles (id, user_id, bio) VALUES (?, ?, ?)")
                .bind(id)
                .bind(user_id)
                .bind(bio)
                .execute(pool)
                .await?;
        }
        ProfileDetails::Admin { gender }
        | ProfileDetails::Faculty { gender }
        | ProfileDetails::Interviewer { gender } => {
            sqlx::query(&format!(
                "INSERT INTO {} (id, user_id, gender) VALUES (?, ?, ?)",
                role.table()
            ))
            .bind(id)
            .bind(user_id)
            .bind(*gender)
            .execute(pool)
            .await?;
        }
    }

    tracing::debug!("Created {} profile for user {}", role, user_id);
    Ok(RoleProfile { id, user_id, details })
}

pub async fn profile_exists(pool: &SqlitePool, role: Role, user_id: Uuid) -> Result<bool, AppError> {
    let (count,): (i64,) = sqlx::query_as(&format!(
        "SELECT COUNT(*) FROM {} WHERE user_id = ?",
        role.table()
    ))
    .bind(user_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

/// Rewrites the user's profile row of `role` without changing its fields.
/// A missing row is written back with default values.
pub async fn save_profile(pool: &SqlitePool, role: Role, user_id: Uuid) -> Result<(), AppError> {
    let sql = match role {
        Role::Student => {
            "INSERT INTO student_profiles (id, user_id, bio) VALUES (?, ?, '') \
             ON CONFLICT(user_id) DO UPDATE SET bio = student_profiles.bio"
                .to_string()
        }
        _ => format!(
            "INSERT INTO {table} (id, user_id, gender) VALUES (?, ?, 'M') \
             ON CONFLICT(user_id) DO UPDATE SET gender = {table}.gender",
            table = role.table()
        ),
    };

    sqlx::query(&sql)
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn find_profile(pool: &SqlitePool, role: Role, id: Uuid) -> Result<Option<RoleProfile>, AppError> {
    let profile = match role {
        Role::Student => sqlx::query_as::<_, StudentRow>(
            "SELECT id, user_id, bio FROM student_profiles WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(RoleProfile::from),
        _ => sqlx::query_as::<_, GenderedRow>(&format!(
            "SELECT id, user_id, gender FROM {} WHERE id = ?",
            role.table()
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .map(|row| row.into_profile(role)),
    };
    Ok(profile)
}

pub async fn find_profile_for_user(
    pool: &SqlitePool,
    role: Role,
    user_id: Uuid,
) -> Result<Option<RoleProfile>, AppError> {
    let profile = match role {
        Role::Student => sqlx::query_as::<_, StudentRow>(
            "SELECT id, user_id, bio FROM student_profiles WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .map(RoleProfile::from),
        _ => sqlx::query_as::<_, GenderedRow>(&format!(
            "SELECT id, user_id, gender FROM {} WHERE user_id = ?",
            role.table()
        ))
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .map(|row| row.into_profile(role)),
    };
    Ok(profile)
}

/// All profiles of one role, ordered by the owning user's email.
pub async fn list_profiles(pool: &SqlitePool, role: Role) -> Result<Vec<RoleProfile>, AppError> {
    let profiles = match role {
        Role::Student => sqlx::query_as::<_, StudentRow>(
            "SELECT p.id, p.user_id, p.bio FROM student_profiles p \
             JOIN users u ON u.id = p.user_id ORDER BY u.email",
        )
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(RoleProfile::from)
        .collect(),
        _ => sqlx::query_as::<_, GenderedRow>(&format!(
            "SELECT p.id, p.user_id, p.gender FROM {} p \
             JOIN users u ON u.id = p.user_id ORDER BY u.email",
            role.table()
        ))
        .fetch_all(pool)
        .await?
        .into_iter()
        .map(|row| row.into_profile(role))
        .collect(),
    };
    Ok(profiles)
}

/// Replaces the role-specific fields of profile `id`. The role is taken from
/// `details`.
pub async fn update_profile(
    pool: &SqlitePool,
    id: Uuid,
    details: ProfileDetails,
) -> Result<RoleProfile, AppError> {
    let role = details.role();
    let res = match &details {
        ProfileDetails::Student { bio } => {
            sqlx::query("UPDATE student_profiles SET bio = ? WHERE id = ?")
                .bind(bio)
                .bind(id)
                .execute(pool)
                .await?
        }
        ProfileDetails::Admin { gender }
        | ProfileDetails::Faculty { gender }
        | ProfileDetails::Interviewer { gender } => {
            sqlx::query(&format!("UPDATE {} SET gender = ? WHERE id = ?", role.table()))
                .bind(*gender)
                .bind(id)
                .execute(pool)
                .await?
        }
    };
    if res.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    find_profile(pool, role, id).await?.ok_or(AppError::NotFound)
}

/// Deletes profile `id`.
///
/// For admin, faculty and interviewer profiles the owning user's flag is
/// cleared and the user saved (synchronizer included) before the row goes.
/// Student profiles are removed without touching the user.
pub async fn delete_profile(pool: &SqlitePool, role: Role, id: Uuid) -> Result<(), AppError> {
    let profile = find_profile(pool, role, id).await?.ok_or(AppError::NotFound)?;

    if role != Role::Student {
        let mut owner = users::find_by_id(pool, profile.user_id)
            .await?
            .ok_or(AppError::NotFound)?;
        owner.set_flag(role, false);
        users::save_user(pool, &mut owner).await?;
        tracing::info!("Cleared {} flag on {} before profile delete", role, owner.email);
    }

    sqlx::query(&format!("DELETE FROM {} WHERE id = ?", role.table()))
        .bind(id)
        .execute(pool)
        .await?;
    tracing::debug!("Deleted {} profile {}", role, id);
    Ok(())
}

/// Convenience for the admin console when only a gender is submitted.
pub fn gendered(role: Role, gender: Gender) -> Option<ProfileDetails> {
    match role {
        Role::Admin => Some(ProfileDetails::Admin { gender }),
        Role::Faculty => Some(ProfileDetails::Faculty { gender }),
        Role::Interviewer => Some(ProfileDetails::Interviewer { gender }),
        Role::Student => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db::test_pool, models::user::RoleFlags, store::users::make_user};

    #[tokio::test]
    async fn save_profile_keeps_fields() {
        let pool = test_pool().await;
        let user = make_user(&pool, "s@example.com", RoleFlags::default()).await;

        let student = find_profile_for_user(&pool, Role::Student, user.id).await.unwrap().unwrap();
        update_profile(&pool, student.id, ProfileDetails::Student { bio: "hello".into() })
            .await
            .unwrap();

        save_profile(&pool, Role::Student, user.id).await.unwrap();
        let again = find_profile_for_user(&pool, Role::Student, user.id).await.unwrap().unwrap();
        assert_eq!(again.id, student.id);
        assert_eq!(again.details, ProfileDetails::Student { bio: "hello".into() });
    }

    #[tokio::test]
    async fn second_profile_of_same_role_violates_unique() {
        let pool = test_pool().await;
        let user = make_user(&pool, "u@example.com", RoleFlags::default()).await;
        let err = create_profile(&pool, Role::Student, user.id).await.unwrap_err();
        assert!(err.is_unique_violation());
    }

    #[tokio::test]
    async fn deleting_admin_profile_clears_flag_first() {
        let pool = test_pool().await;
        let user = make_user(
            &pool,
            "a@example.com",
            RoleFlags { admin: true, ..RoleFlags::default() },
        )
        .await;
        let admin = find_profile_for_user(&pool, Role::Admin, user.id).await.unwrap().unwrap();

        delete_profile(&pool, Role::Admin, admin.id).await.unwrap();

        let owner = users::find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert!(!owner.is_admin);
        assert!(owner.is_student);
        assert!(!profile_exists(&pool, Role::Admin, user.id).await.unwrap());
        assert!(profile_exists(&pool, Role::Student, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn admin_flag_is_persisted_before_profile_row_is_deleted() {
        let pool = test_pool().await;
        let mut user = make_user(
            &pool,
            "order@example.com",
            RoleFlags { admin: true, ..RoleFlags::default() },
        )
        .await;
        // leaves is_interviewer stored with no interviewer row, so every
        // later save fails in the synchronizer
        user.is_interviewer = true;
        assert!(users::save_user(&pool, &mut user).await.is_err());

        let admin = find_profile_for_user(&pool, Role::Admin, user.id).await.unwrap().unwrap();
        let err = delete_profile(&pool, Role::Admin, admin.id).await.unwrap_err();
        assert!(err.is_unique_violation());

        let owner = users::find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert!(!owner.is_admin);
        assert!(profile_exists(&pool, Role::Admin, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_faculty_and_interviewer_profiles_clears_flags() {
        let pool = test_pool().await;
        let user = make_user(
            &pool,
            "fi@example.com",
            RoleFlags { admin: false, student: true, faculty: true, interviewer: true },
        )
        .await;

        for role in [Role::Faculty, Role::Interviewer] {
            let p = find_profile_for_user(&pool, role, user.id).await.unwrap().unwrap();
            delete_profile(&pool, role, p.id).await.unwrap();
            assert!(!profile_exists(&pool, role, user.id).await.unwrap());
        }

        let owner = users::find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert!(!owner.is_faculty);
        assert!(!owner.is_interviewer);
        assert!(owner.is_student);
    }

    #[tokio::test]
    async fn deleting_student_profile_keeps_flag() {
        let pool = test_pool().await;
        let user = make_user(&pool, "st@example.com", RoleFlags::default()).await;
        let p = find_profile_for_user(&pool, Role::Student, user.id).await.unwrap().unwrap();

        delete_profile(&pool, Role::Student, p.id).await.unwrap();

        let owner = users::find_by_id(&pool, user.id).await.unwrap().unwrap();
        assert!(owner.is_student);
        assert!(!profile_exists(&pool, Role::Student, user.id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_unknown_profile_is_not_found() {
        let pool = test_pool().await;
        let err = delete_profile(&pool, Role::Admin, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn update_and_list_gendered_profiles() {
        let pool = test_pool().await;
        let a = make_user(&pool, "b@example.com", RoleFlags::superuser()).await;
        make_user(&pool, "a@example.com", RoleFlags::superuser()).await;

        let profile = find_profile_for_user(&pool, Role::Admin, a.id).await.unwrap().unwrap();
        assert_eq!(profile.details, ProfileDetails::Admin { gender: Gender::Male });

        let updated = update_profile(&pool, profile.id, ProfileDetails::Admin { gender: Gender::Other })
            .await
            .unwrap();
        assert_eq!(updated.details, ProfileDetails::Admin { gender: Gender::Other });

        let listed = list_profiles(&pool, Role::Admin).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].user_id, a.id);
        assert!(list_profiles(&pool, Role::Faculty).await.unwrap().is_empty());
    }
}
