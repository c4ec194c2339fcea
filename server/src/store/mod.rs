//! Account and role profile persistence.
pub mod profiles;
pub mod users;
