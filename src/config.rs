//! Settings read from the environment.
//!
//! Every value has a default, so the server starts with an empty environment. The password is
//! kept in a [SecretString] so that it doesn't leak into logs through `Debug`.

use secrecy::SecretString;

pub const BASE_URL_VAR: &str = "TIMEKEEPER_BASE_URL";
pub const BASE_PORT_VAR: &str = "TIMEKEEPER_BASE_PORT";
pub const PASSWORD_VAR: &str = "TIMEKEEPER_PASSWORD";

const DEFAULT_BASE_URL: &str = "http://localhost";
const DEFAULT_BASE_PORT: &str = "3333";
const DEFAULT_PASSWORD: &str = "password";

#[derive(Debug)]
pub struct Config {
    /// Address clients use to reach the server. Only shown on the index page.
    pub base_url: String,
    /// Port clients use to reach the server. It can differ from the listening port when the
    /// server sits behind a proxy.
    pub base_port: String,
    pub password: SecretString,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the config from an arbitrary variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str, default: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            base_url: var(BASE_URL_VAR, DEFAULT_BASE_URL),
            base_port: var(BASE_PORT_VAR, DEFAULT_BASE_PORT),
            password: SecretString::from(var(PASSWORD_VAR, DEFAULT_PASSWORD)),
        }
    }
}
