use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Session {
    /// At least 32 bytes; a random per-process key is used when absent.
    pub secret: Option<String>,
    pub secure_cookie: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub server: Server,
    pub database: Database,
    pub session: Session,
    pub static_dir: String,
    pub guest_names: Vec<String>,
}

const DEFAULT_GUEST_NAMES: &[&str] = &["Ferris", "Corro", "Crabby", "Clawdia", "Rusty"];

/// `TIPBOARD__*` variables; `guest_names` is read as a comma-separated list.
fn environment() -> Environment {
    Environment::with_prefix("TIPBOARD")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("guest_names")
}

impl Settings {
    /// Defaults, then `tipboard.toml` if present, then `TIPBOARD__*` variables
    /// (e.g. `TIPBOARD__SERVER__PORT=9000`, `TIPBOARD__GUEST_NAMES=Ann,Bob`).
    pub fn new() -> Result<Self, ConfigError> {
        Self::build(environment())
    }

    fn build(env: Environment) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.url", "sqlite:tipboard.db")?
            .set_default("session.secure_cookie", false)?
            .set_default("static_dir", "./static")?
            .set_default(
                "guest_names",
                DEFAULT_GUEST_NAMES.iter().map(|s| s.to_string()).collect::<Vec<_>>(),
            )?
            .add_source(
                File::with_name("tipboard.toml")
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(env)
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: config::Map<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        environment().source(Some(source))
    }

    #[test]
    fn defaults_are_usable() {
        let settings = Settings::build(env(&[])).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert_eq!(settings.database.url, "sqlite:tipboard.db");
        assert!(settings.session.secret.is_none());
        assert!(!settings.guest_names.is_empty());
    }

    #[test]
    fn environment_overrides_defaults() {
        let settings = Settings::build(env(&[
            ("TIPBOARD__SERVER__PORT", "9000"),
            ("TIPBOARD__DATABASE__URL", "sqlite::memory:"),
            ("TIPBOARD__SESSION__SECURE_COOKIE", "true"),
        ]))
        .unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.database.url, "sqlite::memory:");
        assert!(settings.session.secure_cookie);
    }

    #[test]
    fn guest_names_come_from_comma_separated_env() {
        let settings = Settings::build(env(&[("TIPBOARD__GUEST_NAMES", "Ann,Bob")])).unwrap();
        assert_eq!(settings.guest_names, vec!["Ann".to_string(), "Bob".to_string()]);
    }
}
