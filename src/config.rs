//! Process-wide configuration, read once from the environment at startup
//! and never mutated afterward (see Invariant: only the Dispatcher's users
//! map and this config are shared across actor boundaries).

use std::env;

use crate::error::ConfigError;

/// Startup configuration. `password` and `token` are carried as plain
/// `String`s deliberately — they are compared, never hashed or logged (see
/// [`Config`]'s `Debug` impl, which redacts both).
pub struct Config {
    /// Hostname used for TLS certificate acquisition; required unless
    /// `http_only` is set. Certificate acquisition itself is out of scope
    /// for this crate (see the hosting layer).
    pub domain: Option<String>,
    pub password: String,
    pub token: String,
    pub email: Option<String>,
    pub staging: bool,
    pub http_only: bool,
    pub port: u16,
    pub verbose: bool,
    /// If set, a synthetic notification is dispatched to this user every
    /// 15 seconds, for smoke-testing a deployment.
    pub test_user: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("domain", &self.domain)
            .field("password", &"<redacted>")
            .field("token", &"<redacted>")
            .field("email", &self.email)
            .field("staging", &self.staging)
            .field("http_only", &self.http_only)
            .field("port", &self.port)
            .field("verbose", &self.verbose)
            .field("test_user", &self.test_user)
            .finish()
    }
}

impl Config {
    /// Loads and validates configuration from the environment.
    ///
    /// `PASSWORD` and `TOKEN` are always required. `DOMAIN` is required
    /// unless `HTTP_ONLY` is set, since it's only used to request a TLS
    /// certificate for that host.
    pub fn from_env() -> Result<Self, ConfigError> {
        let http_only = env_flag("HTTP_ONLY");
        let password = require_var("PASSWORD")?;
        let token = require_var("TOKEN")?;
        let domain = if http_only {
            env::var("DOMAIN").ok()
        } else {
            Some(require_var("DOMAIN")?)
        };
        let email = env::var("EMAIL").ok();
        let staging = env_flag("STAGING");
        let verbose = env_flag("VERBOSE");
        let test_user = env::var("TEST").ok().filter(|s| !s.is_empty());

        let default_port: u16 = if http_only { 8080 } else { 443 };
        let port = match env::var("PORT") {
            Ok(raw) if !raw.is_empty() => raw
                .parse()
                .map_err(|_| ConfigError::InvalidPort("PORT", raw))?,
            _ => default_port,
        };

        Ok(Config {
            domain,
            password,
            token,
            email,
            staging,
            http_only,
            port,
            verbose,
            test_user,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn require_var(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingVar(name)),
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).is_ok_and(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for var in ["DOMAIN", "PASSWORD", "TOKEN", "EMAIL", "STAGING", "HTTP_ONLY", "PORT", "VERBOSE", "TEST"] {
            env::remove_var(var);
        }
    }

    #[test]
    fn missing_password_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("TOKEN", "tok");
        env::set_var("HTTP_ONLY", "1");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("PASSWORD")));
        clear_all();
    }

    #[test]
    fn domain_not_required_when_http_only() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("PASSWORD", "pw");
        env::set_var("TOKEN", "tok");
        env::set_var("HTTP_ONLY", "1");
        let cfg = Config::from_env().expect("should succeed without DOMAIN");
        assert!(cfg.domain.is_none());
        assert_eq!(cfg.port, 8080);
        clear_all();
    }

    #[test]
    fn domain_required_without_http_only() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("PASSWORD", "pw");
        env::set_var("TOKEN", "tok");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar("DOMAIN")));
        clear_all();
    }

    #[test]
    fn invalid_port_is_rejected() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var("PASSWORD", "pw");
        env::set_var("TOKEN", "tok");
        env::set_var("HTTP_ONLY", "1");
        env::set_var("PORT", "not-a-number");
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPort("PORT", _)));
        clear_all();
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = Config {
            domain: Some("example.com".to_owned()),
            password: "super-secret".to_owned(),
            token: "also-secret".to_owned(),
            email: None,
            staging: false,
            http_only: true,
            port: 8080,
            verbose: false,
            test_user: None,
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(!rendered.contains("also-secret"));
    }
}
