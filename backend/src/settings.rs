//! Service configuration loaded via OrthoConfig.
//!
//! Every value can be supplied on the command line, through `REGISTRAR_*`
//! environment variables, or from a configuration file. Only the listen
//! address has a loader default; accessors default the rest.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::{GradeScale, GradeScaleError, LoginValidationError, NewAccount, RoleProfile};
use crate::outbound::persistence::PoolConfig;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ADMIN_NAME: &str = "Administrator";

/// Errors raised while interpreting settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("invalid bind address {value}: {message}")]
    BindAddr { value: String, message: String },
    #[error("admin bootstrap needs both an email and a password")]
    IncompleteAdmin,
    #[error("invalid admin account: {0}")]
    Admin(#[from] LoginValidationError),
    #[error(transparent)]
    GradeScale(#[from] GradeScaleError),
}

/// Configuration values for the registrar service.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "REGISTRAR")]
pub struct RegistrarSettings {
    /// Socket address the HTTP server listens on.
    #[ortho_config(default = "0.0.0.0:8080".to_owned())]
    pub bind_addr: String,
    /// PostgreSQL connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,
    /// Upper bound on pooled database connections.
    pub db_max_connections: Option<u32>,
    /// Seconds to wait for a pooled connection.
    pub db_connect_timeout_secs: Option<u64>,
    /// JSON file overriding the letter-grade point table.
    pub grade_scale_path: Option<PathBuf>,
    /// Administrator ensured at startup.
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub admin_name: Option<String>,
}

impl Default for RegistrarSettings {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_owned(),
            database_url: None,
            db_max_connections: None,
            db_connect_timeout_secs: None,
            grade_scale_path: None,
            admin_email: None,
            admin_password: None,
            admin_name: None,
        }
    }
}

impl RegistrarSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::BindAddr`] when the value does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let raw = self.bind_addr.trim();
        raw.parse().map_err(|err: std::net::AddrParseError| SettingsError::BindAddr {
            value: raw.to_owned(),
            message: err.to_string(),
        })
    }

    /// Pool configuration when a database is configured.
    pub fn pool_config(&self) -> Option<PoolConfig> {
        let url = self
            .database_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())?;
        let mut config = PoolConfig::new(url);
        if let Some(max) = self.db_max_connections {
            config = config
                .with_max_size(max)
                .with_min_idle(Some(max.min(2)));
        }
        if let Some(secs) = self.db_connect_timeout_secs {
            config = config.with_connection_timeout(Duration::from_secs(secs));
        }
        Some(config)
    }

    /// The configured grade scale, or the standard 4.0 table.
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::GradeScale`] when the file cannot be read or
    /// does not describe every letter.
    pub fn grade_scale(&self) -> Result<GradeScale, SettingsError> {
        match &self.grade_scale_path {
            Some(path) => Ok(GradeScale::load(path)?),
            None => Ok(GradeScale::standard()),
        }
    }

    /// Administrator account to ensure at startup, if one is configured.
    ///
    /// # Errors
    ///
    /// Returns an error when only one of email and password is set, or when
    /// the values fail account validation.
    pub fn admin_account(&self) -> Result<Option<NewAccount>, SettingsError> {
        match (&self.admin_email, &self.admin_password) {
            (None, None) => Ok(None),
            (Some(email), Some(password)) => {
                let name = self.admin_name.as_deref().unwrap_or(DEFAULT_ADMIN_NAME);
                let account = NewAccount::try_new(name, email, password, RoleProfile::Admin)?;
                Ok(Some(account))
            }
            _ => Err(SettingsError::IncompleteAdmin),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 8] = [
        "REGISTRAR_BIND_ADDR",
        "REGISTRAR_DATABASE_URL",
        "REGISTRAR_DB_MAX_CONNECTIONS",
        "REGISTRAR_DB_CONNECT_TIMEOUT_SECS",
        "REGISTRAR_GRADE_SCALE_PATH",
        "REGISTRAR_ADMIN_EMAIL",
        "REGISTRAR_ADMIN_PASSWORD",
        "REGISTRAR_ADMIN_NAME",
    ];

    fn load_from_empty_args() -> RegistrarSettings {
        RegistrarSettings::load_from_iter([OsString::from("registrar")])
            .expect("config should load")
    }

    fn cleared() -> Vec<(&'static str, Option<String>)> {
        VARS.iter().map(|name| (*name, None)).collect()
    }

    #[rstest]
    fn defaults_apply_when_unset() {
        let _guard = lock_env(cleared());

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("default parses"),
            DEFAULT_BIND_ADDR.parse::<SocketAddr>().expect("valid")
        );
        assert!(settings.pool_config().is_none());
        assert!(settings.admin_account().expect("no admin").is_none());
        assert_eq!(
            settings.grade_scale().expect("standard"),
            GradeScale::standard()
        );
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let mut vars = cleared();
        vars.extend([
            ("REGISTRAR_BIND_ADDR", Some("127.0.0.1:9090".to_owned())),
            (
                "REGISTRAR_DATABASE_URL",
                Some("postgres://localhost/registrar".to_owned()),
            ),
            ("REGISTRAR_DB_MAX_CONNECTIONS", Some("4".to_owned())),
            ("REGISTRAR_ADMIN_EMAIL", Some("Root@Example.edu".to_owned())),
            ("REGISTRAR_ADMIN_PASSWORD", Some("correct-horse".to_owned())),
        ]);
        let _guard = lock_env(vars);

        let settings = load_from_empty_args();
        assert_eq!(
            settings.bind_addr().expect("parses").to_string(),
            "127.0.0.1:9090"
        );
        let pool = settings.pool_config().expect("database configured");
        assert_eq!(pool.database_url(), "postgres://localhost/registrar");
        let admin = settings
            .admin_account()
            .expect("valid admin")
            .expect("admin configured");
        assert_eq!(AsRef::<str>::as_ref(&admin.email), "root@example.edu");
        assert_eq!(admin.profile, RoleProfile::Admin);
    }

    #[rstest]
    fn struct_default_matches_loader_default() {
        let _guard = lock_env(cleared());
        assert_eq!(
            load_from_empty_args().bind_addr,
            RegistrarSettings::default().bind_addr
        );
    }

    #[rstest]
    fn half_configured_admin_is_rejected() {
        let settings = RegistrarSettings {
            admin_email: Some("root@example.edu".to_owned()),
            ..RegistrarSettings::default()
        };
        assert!(matches!(
            settings.admin_account(),
            Err(SettingsError::IncompleteAdmin)
        ));
    }

    #[rstest]
    fn malformed_bind_addr_is_reported() {
        let settings = RegistrarSettings {
            bind_addr: "not-an-address".to_owned(),
            ..RegistrarSettings::default()
        };
        assert!(matches!(
            settings.bind_addr(),
            Err(SettingsError::BindAddr { .. })
        ));
    }

    #[rstest]
    fn blank_database_url_means_memory_store() {
        let settings = RegistrarSettings {
            database_url: Some("  ".to_owned()),
            ..RegistrarSettings::default()
        };
        assert!(settings.pool_config().is_none());
    }
}
