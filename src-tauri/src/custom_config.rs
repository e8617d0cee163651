use std::{
    fs, io,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{
    static_serve::ServeOptions, DEFAULT_DEEP_LINK_SCHEME, DEFAULT_HOSTNAME, DEFAULT_INDEX_FILE, DEFAULT_SCHEME,
    DEFAULT_WEB_DIRECTORY,
};

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("failed to read shell config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse shell config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GithubConfig {
    pub(crate) owner: Option<String>,
    pub(crate) repo: Option<String>,
    #[serde(default)]
    pub(crate) private: bool,
    pub(crate) token: Option<String>,
    /// Updater signing key; overrides the key bundled in tauri.conf.json.
    pub(crate) pubkey: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ServerConfig {
    pub(crate) scheme: Option<String>,
    pub(crate) hostname: Option<String>,
    pub(crate) directory: Option<String>,
    pub(crate) file: Option<String>,
    pub(crate) cors_enabled: Option<bool>,
    pub(crate) partition: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DeepLinkConfig {
    #[serde(default)]
    pub(crate) enabled: bool,
    pub(crate) custom_protocol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CustomConfig {
    #[serde(default)]
    pub(crate) key: Option<String>,
    #[serde(default)]
    pub(crate) github: Option<GithubConfig>,
    #[serde(default)]
    pub(crate) server: Option<ServerConfig>,
    #[serde(default)]
    pub(crate) deep_linking: Option<DeepLinkConfig>,
}

impl Default for CustomConfig {
    fn default() -> Self {
        Self {
            key: None,
            github: Some(GithubConfig::default()),
            server: None,
            deep_linking: None,
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

impl CustomConfig {
    /// Serve options for the bundled web content. The directory stays
    /// relative here; `StaticServer::new` resolves it against the app root.
    pub(crate) fn serve_options(&self) -> ServeOptions {
        let server = self.server.clone().unwrap_or_default();
        ServeOptions {
            is_cors_enabled: server.cors_enabled.unwrap_or(true),
            scheme: non_empty(server.scheme.as_deref())
                .unwrap_or(DEFAULT_SCHEME)
                .to_string(),
            hostname: non_empty(server.hostname.as_deref())
                .unwrap_or(DEFAULT_HOSTNAME)
                .to_string(),
            file: non_empty(server.file.as_deref())
                .unwrap_or(DEFAULT_INDEX_FILE)
                .to_string(),
            directory: PathBuf::from(
                non_empty(server.directory.as_deref()).unwrap_or(DEFAULT_WEB_DIRECTORY),
            ),
            partition: non_empty(server.partition.as_deref()).map(str::to_string),
        }
    }

    /// URL scheme to register for deep links, when they are enabled.
    pub(crate) fn deep_link_scheme(&self) -> Option<String> {
        let deep_linking = self.deep_linking.as_ref().filter(|config| config.enabled)?;
        Some(
            non_empty(deep_linking.custom_protocol.as_deref())
                .unwrap_or(DEFAULT_DEEP_LINK_SCHEME)
                .to_string(),
        )
    }
}

pub(crate) fn parse_custom_config(raw: &str) -> Result<CustomConfig, ConfigError> {
    Ok(serde_json::from_str(raw)?)
}

fn read_custom_config(path: &Path) -> Result<Option<CustomConfig>, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    parse_custom_config(&raw).map(Some)
}

/// Reads the first candidate file that exists. Unreadable or malformed files
/// are reported through `log` and skipped; nothing here is fatal.
pub(crate) fn load_custom_config<F>(candidates: &[PathBuf], log: F) -> CustomConfig
where
    F: Fn(&str),
{
    for candidate in candidates {
        match read_custom_config(candidate) {
            Ok(Some(config)) => {
                log(&format!("loaded shell config from {}", candidate.display()));
                return config;
            }
            Ok(None) => {}
            Err(error) => {
                log(&format!(
                    "ignoring shell config {}: {error}",
                    candidate.display()
                ));
            }
        }
    }

    CustomConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn default_config_has_empty_github_block() {
        let config = CustomConfig::default();
        assert_eq!(
            config.github,
            Some(GithubConfig {
                owner: None,
                repo: None,
                private: false,
                token: None,
                pubkey: None,
            })
        );
        assert!(config.key.is_none());
    }

    #[test]
    fn parse_custom_config_defaults_private_to_false() {
        let config =
            parse_custom_config(r#"{"github":{"owner":"o","repo":"r","token":"t"}}"#).unwrap();
        let github = config.github.unwrap();
        assert_eq!(github.owner.as_deref(), Some("o"));
        assert!(!github.private);
    }

    #[test]
    fn parse_custom_config_accepts_nulls_and_unknown_fields() {
        let config = parse_custom_config(
            r#"{"key":"k","github":{"owner":null,"repo":null,"private":true,"token":null},"extra":1}"#,
        )
        .unwrap();
        assert_eq!(config.key.as_deref(), Some("k"));
        assert!(config.github.unwrap().private);
    }

    #[test]
    fn serve_options_fall_back_to_defaults() {
        let options = CustomConfig::default().serve_options();
        assert!(options.is_cors_enabled);
        assert_eq!(options.scheme, "app");
        assert_eq!(options.hostname, "localhost");
        assert_eq!(options.file, "index");
        assert_eq!(options.directory, PathBuf::from("app"));
        assert!(options.partition.is_none());
    }

    #[test]
    fn serve_options_use_server_block_and_ignore_blank_values() {
        let config = parse_custom_config(
            r#"{"server":{"scheme":"shell","hostname":" ","directory":"www","corsEnabled":false,"partition":"persist:main"}}"#,
        )
        .unwrap();
        let options = config.serve_options();
        assert_eq!(options.scheme, "shell");
        assert_eq!(options.hostname, "localhost");
        assert_eq!(options.directory, PathBuf::from("www"));
        assert!(!options.is_cors_enabled);
        assert_eq!(options.partition.as_deref(), Some("persist:main"));
    }

    #[test]
    fn deep_link_scheme_requires_enabled_flag() {
        assert_eq!(CustomConfig::default().deep_link_scheme(), None);

        let disabled =
            parse_custom_config(r#"{"deepLinking":{"customProtocol":"shell"}}"#).unwrap();
        assert_eq!(disabled.deep_link_scheme(), None);

        let defaulted = parse_custom_config(r#"{"deepLinking":{"enabled":true}}"#).unwrap();
        assert_eq!(defaulted.deep_link_scheme().as_deref(), Some("appshell"));

        let custom = parse_custom_config(
            r#"{"deepLinking":{"enabled":true,"customProtocol":"shell"}}"#,
        )
        .unwrap();
        assert_eq!(custom.deep_link_scheme().as_deref(), Some("shell"));
    }

    #[test]
    fn load_custom_config_skips_missing_and_malformed_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let malformed = dir.path().join("malformed.json");
        let valid = dir.path().join("valid.json");
        fs::write(&malformed, "{not json").unwrap();
        fs::write(&valid, r#"{"key":"from-valid"}"#).unwrap();

        let lines = RefCell::new(Vec::new());
        let config = load_custom_config(&[missing, malformed, valid], |line| {
            lines.borrow_mut().push(line.to_string())
        });

        assert_eq!(config.key.as_deref(), Some("from-valid"));
        let lines = lines.into_inner();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ignoring shell config"));
        assert!(lines[1].starts_with("loaded shell config"));
    }

    #[test]
    fn load_custom_config_returns_defaults_without_candidates() {
        let config = load_custom_config(&[], |_| {});
        assert_eq!(config, CustomConfig::default());
    }
}
