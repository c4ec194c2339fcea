use serde::{Serialize, Deserialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

use super::profile::Role;

/// The four independent role flags of an account. Any combination is valid,
/// including none at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleFlags {
    pub admin: bool,
    pub student: bool,
    pub faculty: bool,
    pub interviewer: bool,
}

impl Default for RoleFlags {
    fn default() -> Self {
        Self { admin: false, student: true, faculty: false, interviewer: false }
    }
}

impl RoleFlags {
    pub fn superuser() -> Self {
        Self { admin: true, student: false, faculty: false, interviewer: false }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub is_admin: bool,
    pub is_student: bool,
    pub is_interviewer: bool,
    pub is_faculty: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn has_perm(&self, _perm: &str) -> bool {
        self.is_admin
    }

    pub fn has_module_perms(&self, _app_label: &str) -> bool {
        true
    }

    pub fn is_staff(&self) -> bool {
        self.is_admin
    }

    pub fn set_flag(&mut self, role: Role, value: bool) {
        match role {
            Role::Admin => self.is_admin = value,
            Role::Student => self.is_student = value,
            Role::Faculty => self.is_faculty = value,
            Role::Interviewer => self.is_interviewer = value,
        }
    }

    pub fn flags(&self) -> RoleFlags {
        RoleFlags {
            admin: self.is_admin,
            student: self.is_student,
            faculty: self.is_faculty,
            interviewer: self.is_interviewer,
        }
    }
}

impl std::fmt::Display for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.email)
    }
}

/// Lower-cases the domain part of an email address. The local part is
/// case-sensitive and left alone; strings without `@` pass through.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: "x@y.z".into(),
            first_name: "X".into(),
            last_name: "Y".into(),
            password_hash: String::new(),
            is_active: true,
            is_admin: false,
            is_student: true,
            is_interviewer: false,
            is_faculty: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn normalize_lowercases_domain_only() {
        assert_eq!(normalize_email("Jane.Doe@Example.COM"), "Jane.Doe@example.com");
        assert_eq!(normalize_email("  a@B.org "), "a@b.org");
        assert_eq!(normalize_email("no-at-sign"), "no-at-sign");
        assert_eq!(normalize_email("we@ird@HOST"), "we@ird@host");
    }

    #[test]
    fn permission_predicates_follow_admin_flag() {
        let mut u = user();
        assert!(!u.has_perm("anything"));
        assert!(!u.is_staff());
        assert!(u.has_module_perms("accounts"));

        u.set_flag(Role::Admin, true);
        assert!(u.has_perm("anything"));
        assert!(u.is_staff());
        assert!(u.has_module_perms("accounts"));
    }

    #[test]
    fn default_flags_are_student_only() {
        assert_eq!(
            RoleFlags::default(),
            RoleFlags { admin: false, student: true, faculty: false, interviewer: false }
        );
        assert_eq!(user().flags(), RoleFlags::default());
        assert_eq!(user().to_string(), "x@y.z");
    }
}
