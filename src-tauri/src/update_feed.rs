use serde::{Deserialize, Serialize};
use tauri::http::header::{HeaderName, ACCEPT, AUTHORIZATION, USER_AGENT};
use url::Url;

use crate::{custom_config::GithubConfig, GITHUB_USER_AGENT};

pub(crate) const GITHUB_PROVIDER: &str = "github";
const LATEST_MANIFEST: &str = "latest.json";
const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_JSON: &str = "application/vnd.github+json";
const OCTET_STREAM: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub(crate) enum FeedConfigError {
    #[error("GitHub configuration is missing `{0}`")]
    MissingField(&'static str),
    #[error("invalid update endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum FeedError {
    #[error(transparent)]
    Config(#[from] FeedConfigError),
    #[error("failed to query latest release: {0}")]
    Request(#[source] reqwest::Error),
    #[error("latest release query failed with HTTP {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("failed to parse latest release: {0}")]
    Parse(#[source] reqwest::Error),
    #[error("latest release has no `{LATEST_MANIFEST}` asset")]
    MissingManifest,
}

/// Where update packages are published and how to authenticate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FeedDescriptor {
    pub(crate) provider: String,
    pub(crate) owner: String,
    pub(crate) repo: String,
    pub(crate) private: bool,
    pub(crate) token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) pubkey: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GithubAsset {
    pub(crate) name: String,
    pub(crate) url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct GithubRelease {
    #[serde(default)]
    pub(crate) assets: Vec<GithubAsset>,
}

fn required(value: Option<&str>, field: &'static str) -> Result<String, FeedConfigError> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(FeedConfigError::MissingField(field))
}

impl GithubConfig {
    pub(crate) fn feed_descriptor(&self) -> Result<FeedDescriptor, FeedConfigError> {
        Ok(FeedDescriptor {
            provider: GITHUB_PROVIDER.to_string(),
            owner: required(self.owner.as_deref(), "owner")?,
            repo: required(self.repo.as_deref(), "repo")?,
            private: self.private,
            token: required(self.token.as_deref(), "token")?,
            pubkey: required(self.pubkey.as_deref(), "pubkey").ok(),
        })
    }
}

impl FeedDescriptor {
    /// Public download URL of the manifest attached to the latest release.
    pub(crate) fn public_manifest_url(&self) -> Result<Url, FeedConfigError> {
        Ok(Url::parse(&format!(
            "https://github.com/{}/{}/releases/latest/download/{LATEST_MANIFEST}",
            self.owner, self.repo
        ))?)
    }

    pub(crate) fn latest_release_api_url(&self) -> Result<Url, FeedConfigError> {
        Ok(Url::parse(&format!(
            "{GITHUB_API_BASE}/repos/{}/{}/releases/latest",
            self.owner, self.repo
        ))?)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }

    /// Headers for the updater's manifest and package requests. Private
    /// assets are only served by the releases API, as raw bytes.
    pub(crate) fn updater_headers(&self) -> Vec<(HeaderName, String)> {
        if !self.private {
            return Vec::new();
        }
        vec![
            (AUTHORIZATION, self.bearer()),
            (ACCEPT, OCTET_STREAM.to_string()),
        ]
    }

    /// API url of the manifest asset in `release`.
    pub(crate) fn manifest_asset_url(&self, release: &GithubRelease) -> Result<Url, FeedError> {
        let asset = release
            .assets
            .iter()
            .find(|asset| asset.name == LATEST_MANIFEST)
            .ok_or(FeedError::MissingManifest)?;
        Url::parse(&asset.url).map_err(|error| FeedConfigError::from(error).into())
    }

    /// Manifest endpoint for the updater. Private repositories need a
    /// releases API lookup because github.com download links reject tokens.
    pub(crate) async fn resolve_endpoint(&self, client: &reqwest::Client) -> Result<Url, FeedError> {
        if !self.private {
            return Ok(self.public_manifest_url()?);
        }

        let response = client
            .get(self.latest_release_api_url()?)
            .header(AUTHORIZATION, self.bearer())
            .header(ACCEPT, GITHUB_JSON)
            .header(USER_AGENT, GITHUB_USER_AGENT)
            .send()
            .await
            .map_err(FeedError::Request)?;
        if !response.status().is_success() {
            return Err(FeedError::HttpStatus(response.status()));
        }

        let release: GithubRelease = response.json().await.map_err(FeedError::Parse)?;
        self.manifest_asset_url(&release)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn github(owner: Option<&str>, repo: Option<&str>, token: Option<&str>) -> GithubConfig {
        GithubConfig {
            owner: owner.map(str::to_string),
            repo: repo.map(str::to_string),
            private: false,
            token: token.map(str::to_string),
            pubkey: None,
        }
    }

    fn private_descriptor() -> FeedDescriptor {
        let mut config = github(Some("acme"), Some("shell"), Some("t"));
        config.private = true;
        config.feed_descriptor().unwrap()
    }

    #[test]
    fn feed_descriptor_copies_github_block() {
        let descriptor = github(Some("o"), Some("r"), Some("t"))
            .feed_descriptor()
            .unwrap();
        assert_eq!(
            serde_json::to_value(&descriptor).unwrap(),
            json!({"provider": "github", "owner": "o", "repo": "r", "private": false, "token": "t"})
        );
    }

    #[test]
    fn feed_descriptor_keeps_non_blank_pubkey() {
        let mut config = github(Some("o"), Some("r"), Some("t"));
        config.pubkey = Some("  ".to_string());
        assert_eq!(config.feed_descriptor().unwrap().pubkey, None);

        config.pubkey = Some("dW50cnVzdGVk".to_string());
        assert_eq!(
            config.feed_descriptor().unwrap().pubkey.as_deref(),
            Some("dW50cnVzdGVk")
        );
    }

    #[test]
    fn feed_descriptor_names_first_missing_field() {
        assert_eq!(
            github(None, Some("r"), Some("t")).feed_descriptor(),
            Err(FeedConfigError::MissingField("owner"))
        );
        assert_eq!(
            github(Some("o"), Some("  "), Some("t")).feed_descriptor(),
            Err(FeedConfigError::MissingField("repo"))
        );
        assert_eq!(
            github(Some("o"), Some("r"), None).feed_descriptor(),
            Err(FeedConfigError::MissingField("token"))
        );
    }

    #[test]
    fn public_feed_uses_release_download_without_headers() {
        let descriptor = github(Some("acme"), Some("shell"), Some("t"))
            .feed_descriptor()
            .unwrap();
        assert_eq!(
            descriptor.public_manifest_url().unwrap().as_str(),
            "https://github.com/acme/shell/releases/latest/download/latest.json"
        );
        assert!(descriptor.updater_headers().is_empty());
    }

    #[test]
    fn private_feed_sends_token_and_asks_for_raw_asset_bytes() {
        let descriptor = private_descriptor();

        assert_eq!(
            descriptor.latest_release_api_url().unwrap().as_str(),
            "https://api.github.com/repos/acme/shell/releases/latest"
        );
        assert_eq!(
            descriptor.updater_headers(),
            vec![
                (AUTHORIZATION, "Bearer t".to_string()),
                (ACCEPT, "application/octet-stream".to_string()),
            ]
        );
    }

    #[test]
    fn private_endpoint_is_the_manifest_asset_api_url() {
        let release: GithubRelease = serde_json::from_value(json!({
            "tag_name": "v1.1.0",
            "assets": [
                {"name": "app-shell_1.1.0_amd64.AppImage", "url": "https://api.github.com/repos/acme/shell/releases/assets/10"},
                {"name": "latest.json", "url": "https://api.github.com/repos/acme/shell/releases/assets/11"}
            ]
        }))
        .unwrap();

        let endpoint = private_descriptor().manifest_asset_url(&release).unwrap();

        assert_eq!(
            endpoint.as_str(),
            "https://api.github.com/repos/acme/shell/releases/assets/11"
        );
    }

    #[test]
    fn release_without_manifest_is_an_error() {
        let release: GithubRelease = serde_json::from_value(json!({"assets": []})).unwrap();
        assert!(matches!(
            private_descriptor().manifest_asset_url(&release),
            Err(FeedError::MissingManifest)
        ));
    }

    #[tokio::test]
    async fn public_endpoint_resolves_without_network() {
        let descriptor = github(Some("acme"), Some("shell"), Some("t"))
            .feed_descriptor()
            .unwrap();
        let endpoint = descriptor
            .resolve_endpoint(&reqwest::Client::new())
            .await
            .unwrap();
        assert_eq!(endpoint, descriptor.public_manifest_url().unwrap());
    }
}
