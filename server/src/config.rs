// /server/src/config.rs
use std::{env, net::SocketAddr};

const DEFAULT_DATABASE_URL: &str = "sqlite:accounts.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3003";
const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 14;
const MAX_SESSION_TTL_HOURS: i64 = 24 * 366;
const DEFAULT_LOGIN_REDIRECT_URL: &str = "/index/";

/// Superuser created on startup when `SUPERUSER_EMAIL` is set and no
/// account with that email exists yet.
#[derive(Clone, Debug)]
pub struct SuperuserSeed {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub password: Option<String>,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: SocketAddr,
    pub session_ttl_hours: i64,
    pub login_redirect_url: String,
    pub superuser: Option<SuperuserSeed>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("jwt_secret", &"<redacted>")
            .field("bind_addr", &self.bind_addr)
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("login_redirect_url", &self.login_redirect_url)
            .field("superuser", &self.superuser.as_ref().map(|s| &s.email))
            .finish()
    }
}

/// Session lifetime in hours; must lie in `1..=MAX_SESSION_TTL_HOURS`.
fn parse_session_ttl(s: &str) -> Result<i64, String> {
    let hours: i64 = s
        .trim()
        .parse()
        .map_err(|e| format!("Error parsing SESSION_TTL_HOURS {:?}: {}", s, e))?;
    if !(1..=MAX_SESSION_TTL_HOURS).contains(&hours) {
        return Err(format!(
            "SESSION_TTL_HOURS must be between 1 and {}, got {}",
            MAX_SESSION_TTL_HOURS, hours
        ));
    }
    Ok(hours)
}

impl Config {
    /// Reads configuration from the process environment. `.env` is expected
    /// to have been loaded already.
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET must be set".to_string())?;
        if jwt_secret.is_empty() {
            return Err("JWT_SECRET must not be empty".to_string());
        }

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .parse()
            .map_err(|e| format!("Error parsing BIND_ADDR {:?}: {}", &bind_addr, e))?;

        let session_ttl_hours = match env::var("SESSION_TTL_HOURS") {
            Ok(s) => parse_session_ttl(&s)?,
            Err(_) => DEFAULT_SESSION_TTL_HOURS,
        };

        let login_redirect_url = env::var("LOGIN_REDIRECT_URL")
            .unwrap_or_else(|_| DEFAULT_LOGIN_REDIRECT_URL.to_string());

        let superuser = env::var("SUPERUSER_EMAIL").ok().map(|email| SuperuserSeed {
            email,
            first_name: env::var("SUPERUSER_FIRST_NAME").unwrap_or_else(|_| "Admin".to_string()),
            last_name: env::var("SUPERUSER_LAST_NAME").unwrap_or_default(),
            password: env::var("SUPERUSER_PASSWORD").ok(),
        });

        Ok(Self {
            database_url,
            jwt_secret,
            bind_addr,
            session_ttl_hours,
            login_redirect_url,
            superuser,
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            jwt_secret: "test-secret".to_string(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            session_ttl_hours: 1,
            login_redirect_url: DEFAULT_LOGIN_REDIRECT_URL.to_string(),
            superuser: None,
        }
    }
}
