use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
    Faculty,
    Interviewer,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Admin, Role::Student, Role::Faculty, Role::Interviewer];

    pub fn table(self) -> &'static str {
        match self {
            Role::Admin => "admin_profiles",
            Role::Student => "student_profiles",
            Role::Faculty => "faculty_profiles",
            Role::Interviewer => "interviewer_profiles",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Student => "student",
            Role::Faculty => "faculty",
            Role::Interviewer => "interviewer",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "student" => Ok(Role::Student),
            "faculty" => Ok(Role::Faculty),
            "interviewer" => Ok(Role::Interviewer),
            _ => Err(format!("{:?} is not a valid role", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
pub enum Gender {
    #[default]
    #[sqlx(rename = "M")]
    Male,
    #[sqlx(rename = "F")]
    Female,
    #[sqlx(rename = "O")]
    Other,
}

/// Role-specific fields of a profile; the variant doubles as the role tag.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum ProfileDetails {
    Admin { gender: Gender },
    Student { bio: String },
    Faculty { gender: Gender },
    Interviewer { gender: Gender },
}

impl ProfileDetails {
    /// Field values written when the synchronizer creates a profile.
    /// Student bio has no real default; an empty string is stored.
    pub fn default_for(role: Role) -> Self {
        match role {
            Role::Admin => ProfileDetails::Admin { gender: Gender::default() },
            Role::Student => ProfileDetails::Student { bio: String::new() },
            Role::Faculty => ProfileDetails::Faculty { gender: Gender::default() },
            Role::Interviewer => ProfileDetails::Interviewer { gender: Gender::default() },
        }
    }

    pub fn role(&self) -> Role {
        match self {
            ProfileDetails::Admin { .. } => Role::Admin,
            ProfileDetails::Student { .. } => Role::Student,
            ProfileDetails::Faculty { .. } => Role::Faculty,
            ProfileDetails::Interviewer { .. } => Role::Interviewer,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct RoleProfile {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(flatten)]
    pub details: ProfileDetails,
}

/// Row shape shared by the admin, faculty and interviewer tables.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct GenderedRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub gender: Gender,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct StudentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: String,
}

impl GenderedRow {
    pub(crate) fn into_profile(self, role: Role) -> RoleProfile {
        let details = match role {
            Role::Admin => ProfileDetails::Admin { gender: self.gender },
            Role::Faculty => ProfileDetails::Faculty { gender: self.gender },
            Role::Interviewer => ProfileDetails::Interviewer { gender: self.gender },
            Role::Student => ProfileDetails::Student { bio: String::new() },
        };
        RoleProfile { id: self.id, user_id: self.user_id, details }
    }
}

impl From<StudentRow> for RoleProfile {
    fn from(row: StudentRow) -> Self {
        RoleProfile {
            id: row.id,
            user_id: row.user_id,
            details: ProfileDetails::Student { bio: row.bio },
        }
    }
}
