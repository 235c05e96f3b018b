//! Layered configuration for modsync.
//!
//! Sources are merged in order, later ones winning:
//!
//! 1. Built-in defaults.
//! 2. `modsync.toml` in the platform configuration directory, if present.
//! 3. An explicitly given file (`.toml`, `.yaml`/`.yml` or `.json`).
//! 4. Environment variables prefixed `MODSYNC_`, with `__` separating
//!    sections: `MODSYNC_REFRESH__PAGE_SIZE=25`.
//!
//! ```toml
//! [source]
//! api_key = "..."
//!
//! [mods]
//! directory = "/srv/hytale/mods"
//! dry_run = true
//! ```

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use exn::ResultExt;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
use modsync_library::{RefreshOptions, ScanOptions, ServiceOptions};
use modsync_source::{CurseForgeOptions, DEFAULT_BASE_URL, DEFAULT_GAME_ID};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_PREFIX: &str = "MODSYNC_";
pub const CONFIG_FILE_NAME: &str = "modsync.toml";
/// Largest page the catalog serves.
pub const MAX_PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub refresh: RefreshConfig,
    pub mods: ModsConfig,
    pub service: ServiceConfig,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub game_id: u32,
    pub timeout_secs: u64,
}
impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            game_id: DEFAULT_GAME_ID,
            timeout_secs: 30,
        }
    }
}
impl Debug for SourceConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SourceConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("game_id", &self.game_id)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    pub interval_secs: u64,
    pub page_size: usize,
    pub max_pages: usize,
    pub page_delay_ms: u64,
}
impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30 * 60,
            page_size: MAX_PAGE_SIZE,
            max_pages: 200,
            page_delay_ms: 250,
        }
    }
}
impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModsConfig {
    /// Absolute path of the installed mods directory. Required.
    pub directory: PathBuf,
    pub extensions: Vec<String>,
    /// Download and verify updates without touching the mods directory.
    pub dry_run: bool,
}
impl Default for ModsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            extensions: ScanOptions::default().extensions,
            dry_run: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub allowed_origins: Vec<String>,
}
impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            allowed_origins: ServiceOptions::default().allowed_origins,
        }
    }
}

/// `modsync.toml` in the platform configuration directory.
pub fn default_config_file() -> Option<PathBuf> {
    ProjectDirs::from("", "", "modsync").map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

impl Config {
    /// Load from every source and validate.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let platform = default_config_file();
        Self::from_figment(Self::figment(platform.as_deref(), explicit)?)
    }

    /// Merge the sources without extracting. The platform file is skipped
    /// when missing; an explicit file must exist.
    pub fn figment(platform: Option<&Path>, explicit: Option<&Path>) -> Result<Figment> {
        let mut figment = Figment::from(Serialized::defaults(Config::default()));
        if let Some(platform) = platform {
            if platform.exists() {
                tracing::debug!(path = %platform.display(), "Loading platform configuration file");
                figment = figment.merge(Toml::file(platform));
            }
        }
        if let Some(explicit) = explicit {
            if !explicit.exists() {
                exn::bail!(ErrorKind::NotFound(explicit.to_path_buf()));
            }
            tracing::debug!(path = %explicit.display(), "Loading configuration file");
            figment = match explicit.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase).as_deref() {
                Some("toml") => figment.merge(Toml::file(explicit)),
                Some("yaml" | "yml") => figment.merge(Yaml::file(explicit)),
                Some("json") => figment.merge(Json::file(explicit)),
                _ => exn::bail!(ErrorKind::UnsupportedFormat(explicit.to_path_buf())),
            };
        }
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split("__")))
    }

    pub fn from_figment(figment: Figment) -> Result<Self> {
        let config: Config = figment.extract().or_raise(|| ErrorKind::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| exn::Exn::from(ErrorKind::Invalid(reason.to_string()));
        if !(1..=MAX_PAGE_SIZE).contains(&self.refresh.page_size) {
            return Err(invalid("refresh.page_size must be between 1 and 50"));
        }
        if self.refresh.interval_secs == 0 {
            return Err(invalid("refresh.interval_secs must be greater than zero"));
        }
        if self.refresh.max_pages == 0 {
            return Err(invalid("refresh.max_pages must be greater than zero"));
        }
        if self.source.timeout_secs == 0 {
            return Err(invalid("source.timeout_secs must be greater than zero"));
        }
        if self.mods.directory.as_os_str().is_empty() {
            return Err(invalid("mods.directory is required"));
        }
        if !self.mods.directory.is_absolute() {
            return Err(invalid("mods.directory must be an absolute path"));
        }
        if self.mods.extensions.is_empty() {
            return Err(invalid("mods.extensions must not be empty"));
        }
        Ok(())
    }

    pub fn source_options(&self) -> CurseForgeOptions {
        CurseForgeOptions {
            base_url: self.source.base_url.clone(),
            api_key: self.source.api_key.clone(),
            game_id: self.source.game_id,
            timeout: Duration::from_secs(self.source.timeout_secs),
            ..CurseForgeOptions::default()
        }
    }

    pub fn service_options(&self) -> ServiceOptions {
        ServiceOptions {
            scan: ScanOptions {
                extensions: self.mods.extensions.iter().map(|ext| ext.trim_start_matches('.').to_string()).collect(),
            },
            refresh: RefreshOptions {
                page_size: self.refresh.page_size,
                max_pages: self.refresh.max_pages,
                page_delay: Duration::from_millis(self.refresh.page_delay_ms),
            },
            catalog_page_size: self.refresh.page_size,
            search_page_size: self.refresh.page_size,
            allowed_origins: self.service.allowed_origins.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    fn valid() -> Config {
        Config {
            mods: ModsConfig {
                directory: PathBuf::from("/srv/hytale/mods"),
                ..ModsConfig::default()
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.source.base_url, "https://api.curseforge.com/v1");
        assert_eq!(config.source.game_id, 70216);
        assert_eq!(config.refresh.interval(), Duration::from_secs(1800));
        assert_eq!(config.refresh.page_size, 50);
        assert_eq!(config.mods.extensions, ["jar", "zip"]);
        assert!(!config.mods.dry_run);
        assert_eq!(config.service.allowed_origins, ["http://localhost:3000"]);
    }

    #[test]
    fn test_default_config_requires_directory() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(reason) if reason.contains("mods.directory")));
        assert!(valid().validate().is_ok());
    }

    #[rstest]
    #[case(|c: &mut Config| c.refresh.page_size = 0)]
    #[case(|c: &mut Config| c.refresh.page_size = 51)]
    #[case(|c: &mut Config| c.refresh.interval_secs = 0)]
    #[case(|c: &mut Config| c.refresh.max_pages = 0)]
    #[case(|c: &mut Config| c.source.timeout_secs = 0)]
    #[case(|c: &mut Config| c.mods.directory = PathBuf::from("relative/mods"))]
    #[case(|c: &mut Config| c.mods.extensions.clear())]
    fn test_validation_rejects(#[case] mutate: fn(&mut Config)) {
        let mut config = valid();
        mutate(&mut config);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_layering() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "platform.toml",
                r#"
                [source]
                api_key = "from-platform"
                [mods]
                directory = "/srv/platform/mods"
                "#,
            )?;
            jail.create_file(
                "explicit.yaml",
                "refresh:\n  page_size: 20\nmods:\n  directory: /srv/explicit/mods\n",
            )?;
            jail.set_env("MODSYNC_REFRESH__PAGE_SIZE", "10");
            jail.set_env("MODSYNC_MODS__DRY_RUN", "true");

            let figment = Config::figment(Some(Path::new("platform.toml")), Some(Path::new("explicit.yaml")))
                .map_err(|err| err.to_string())?;
            let config = Config::from_figment(figment).map_err(|err| err.to_string())?;

            assert_eq!(config.source.api_key.as_deref(), Some("from-platform"));
            assert_eq!(config.mods.directory, Path::new("/srv/explicit/mods"));
            assert_eq!(config.refresh.page_size, 10);
            assert!(config.mods.dry_run);
            assert_eq!(config.refresh.max_pages, 200);
            Ok(())
        });
    }

    #[test]
    fn test_missing_platform_file_is_skipped() {
        Jail::expect_with(|jail| {
            jail.set_env("MODSYNC_MODS__DIRECTORY", "/srv/env/mods");
            let figment = Config::figment(Some(Path::new("nowhere.toml")), None).map_err(|err| err.to_string())?;
            let config = Config::from_figment(figment).map_err(|err| err.to_string())?;
            assert_eq!(config.mods.directory, Path::new("/srv/env/mods"));
            Ok(())
        });
    }

    #[test]
    fn test_explicit_file_errors() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.toml");
        let err = Config::figment(None, Some(&missing)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));

        let ini = temp_dir.path().join("modsync.ini");
        std::fs::write(&ini, "directory=/srv").unwrap();
        let err = Config::figment(None, Some(&ini)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnsupportedFormat(_)));
    }

    #[test]
    fn test_malformed_values() {
        Jail::expect_with(|jail| {
            jail.create_file("modsync.json", r#"{"refresh": {"page_size": "many"}}"#)?;
            let figment = Config::figment(None, Some(Path::new("modsync.json"))).map_err(|err| err.to_string())?;
            let err = Config::from_figment(figment).unwrap_err();
            assert!(matches!(&*err, ErrorKind::Malformed));
            Ok(())
        });
    }

    #[test]
    fn test_into_options() {
        let mut config = valid();
        config.source.api_key = Some("secret".to_string());
        config.mods.extensions = vec![".jar".to_string()];
        config.refresh.page_delay_ms = 0;

        let source = config.source_options();
        assert_eq!(source.api_key.as_deref(), Some("secret"));
        assert_eq!(source.timeout, Duration::from_secs(30));
        let service = config.service_options();
        assert_eq!(service.scan.extensions, ["jar"]);
        assert_eq!(service.refresh.page_delay, Duration::ZERO);
        assert_eq!(service.catalog_page_size, 50);
        assert!(!format!("{:?}", config.source).contains("secret"));
    }
}
