use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    pub dir: PathBuf,
    /// Emit the template engine's internal parse/render logs.
    pub debug: bool,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        TemplateSettings {
            dir: PathBuf::from("templates"),
            debug: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: u32,
    /// Directory of `*.sql` files applied once each, in filename order.
    pub migrations_dir: Option<PathBuf>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            url: "sqlite://gigboard.db?mode=rwc".to_string(),
            max_connections: 5,
            migrations_dir: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Enables template live-reload over `/ws/reload`.
    pub debug: bool,
    pub host: String,
    pub port: u16,
    pub database: DatabaseSettings,
    pub template: TemplateSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            debug: false,
            host: "127.0.0.1".to_string(),
            port: 5000,
            database: DatabaseSettings::default(),
            template: TemplateSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file; absent keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply `GIGBOARD_*` environment overrides on top of the loaded values.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(host) = lookup("GIGBOARD_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("GIGBOARD_PORT") {
            self.port = port
                .parse()
                .map_err(|_| Error::Config(format!("GIGBOARD_PORT is not a port: {port}")))?;
        }
        if let Some(url) = lookup("GIGBOARD_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(debug) = lookup("GIGBOARD_DEBUG") {
            self.debug = matches!(debug.as_str(), "1" | "true" | "yes" | "on");
        }
        Ok(self)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
