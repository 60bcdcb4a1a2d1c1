//! Configuration file (redocx.toml) and command-line overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use redocx_build::{BuildConfig, Extensions};
use redocx_server::{FailurePolicy, PublisherConfig};

/// Configuration file structure (redocx.toml).
#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct ConfigFile {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub build: BuildSettings,
    #[serde(default)]
    pub share: ShareSettings,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Root of the rendered artifact tree
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct BuildSettings {
    /// Render tool program and leading arguments
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    #[serde(default = "default_source_ext")]
    pub source_ext: String,
    #[serde(default = "default_rendered_ext")]
    pub rendered_ext: String,
    #[serde(default)]
    pub on_failure: FailurePolicy,
    pub timeout_secs: Option<u64>,
    /// Quiet period before a changed file is rebuilt; 0 rebuilds on every event
    #[serde(default)]
    pub debounce_ms: u64,
}

#[derive(Debug, Deserialize, PartialEq)]
pub struct ShareSettings {
    /// Network interface whose address goes into share links
    #[serde(default = "default_interface")]
    pub interface: String,
    #[serde(default = "default_clipboard")]
    pub clipboard: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    28888
}
fn default_base_dir() -> PathBuf {
    PathBuf::from("api_docs")
}
fn default_command() -> Vec<String> {
    vec!["npx".to_string(), "@redocly/cli".to_string()]
}
fn default_source_ext() -> String {
    "yaml".to_string()
}
fn default_rendered_ext() -> String {
    "html".to_string()
}
fn default_interface() -> String {
    "en0".to_string()
}
fn default_clipboard() -> bool {
    true
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            base_dir: default_base_dir(),
        }
    }
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            command: default_command(),
            source_ext: default_source_ext(),
            rendered_ext: default_rendered_ext(),
            on_failure: FailurePolicy::default(),
            timeout_secs: None,
            debounce_ms: 0,
        }
    }
}

impl Default for ShareSettings {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            clipboard: default_clipboard(),
        }
    }
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Default)]
pub struct Overrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub base_dir: Option<PathBuf>,
    pub interface: Option<String>,
    pub on_failure: Option<FailurePolicy>,
    pub debounce_ms: Option<u64>,
    pub no_clipboard: bool,
}

/// Load configuration from `path` if it exists.
/// Returns an error if the config file exists but is malformed.
pub fn load_config(path: &Path) -> Result<ConfigFile> {
    if !path.exists() {
        return Ok(ConfigFile::default());
    }

    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    tracing::info!("Loaded config from {}", path.display());

    Ok(config)
}

impl ConfigFile {
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(host) = overrides.host {
            self.server.host = host;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(base_dir) = overrides.base_dir {
            self.server.base_dir = base_dir;
        }
        if let Some(interface) = overrides.interface {
            self.share.interface = interface;
        }
        if let Some(policy) = overrides.on_failure {
            self.build.on_failure = policy;
        }
        if let Some(debounce_ms) = overrides.debounce_ms {
            self.build.debounce_ms = debounce_ms;
        }
        if overrides.no_clipboard {
            self.share.clipboard = false;
        }
    }

    pub fn extensions(&self) -> Extensions {
        Extensions {
            source: self.build.source_ext.clone(),
            rendered: self.build.rendered_ext.clone(),
        }
    }

    pub fn publisher(&self) -> PublisherConfig {
        PublisherConfig {
            base_dir: self.server.base_dir.clone(),
            host: self.server.host.clone(),
            port: self.server.port,
        }
    }

    pub fn builder(&self) -> BuildConfig {
        BuildConfig {
            base_dir: self.server.base_dir.clone(),
            command: self.build.command.clone(),
            timeout: self.build.timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.build.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_legacy_defaults() {
        let temp = tempdir().unwrap();

        let config = load_config(&temp.path().join("redocx.toml")).unwrap();

        assert_eq!(config, ConfigFile::default());
        assert_eq!(config.server.port, 28888);
        assert_eq!(config.server.base_dir, PathBuf::from("api_docs"));
        assert_eq!(config.share.interface, "en0");
        assert_eq!(config.build.command, vec!["npx", "@redocly/cli"]);
        assert_eq!(config.build.on_failure, FailurePolicy::Abort);
    }

    #[test]
    fn partial_file_keeps_defaults_for_the_rest() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("redocx.toml");
        fs::write(
            &path,
            r#"
[server]
port = 9000

[build]
on_failure = "skip"
timeout_secs = 30
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.build.on_failure, FailurePolicy::Skip);
        assert_eq!(config.builder().timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.share, ShareSettings::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("redocx.toml");
        fs::write(&path, "[build]\non_failure = \"retry\"\n").unwrap();

        assert!(load_config(&path).is_err());
    }

    #[test]
    fn overrides_win_over_file_values() {
        let mut config = ConfigFile::default();
        config.server.port = 9000;

        config.apply(Overrides {
            port: Some(8080),
            interface: Some("eth0".to_string()),
            debounce_ms: Some(250),
            no_clipboard: true,
            ..Default::default()
        });

        assert_eq!(config.server.port, 8080);
        assert_eq!(config.share.interface, "eth0");
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert!(!config.share.clipboard);
        assert_eq!(config.server.host, "0.0.0.0");
    }

    #[test]
    fn builder_and_publisher_share_the_base_dir() {
        let mut config = ConfigFile::default();
        config.apply(Overrides {
            base_dir: Some(PathBuf::from("/srv/docs")),
            ..Default::default()
        });

        assert_eq!(config.builder().base_dir, PathBuf::from("/srv/docs"));
        assert_eq!(config.publisher().base_dir, PathBuf::from("/srv/docs"));
    }
}
