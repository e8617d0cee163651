use std::{
    io,
    path::{Path, PathBuf},
};

use percent_encoding::percent_decode_str;
use tauri::{Runtime, WebviewWindow};
use url::Url;

use crate::LOG_TARGET_STATIC_SERVE;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ServeError {
    #[error("the `directory` option is required")]
    MissingDirectory,
    #[error("invalid custom scheme '{0}'")]
    InvalidScheme(String),
    #[error("invalid content url for scheme '{scheme}': {source}")]
    InvalidUrl {
        scheme: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ServeOptions {
    pub(crate) is_cors_enabled: bool,
    pub(crate) scheme: String,
    pub(crate) hostname: String,
    pub(crate) file: String,
    pub(crate) directory: PathBuf,
    pub(crate) partition: Option<String>,
}

/// Capabilities the custom scheme is registered with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SchemePrivileges {
    pub(crate) standard: bool,
    pub(crate) secure: bool,
    pub(crate) allow_service_workers: bool,
    pub(crate) support_fetch_api: bool,
    pub(crate) cors_enabled: bool,
    pub(crate) stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FallbackReason {
    NotFound,
    InvalidPath,
    Escaped,
    Io(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Resolution {
    File(PathBuf),
    Fallback { path: PathBuf, reason: FallbackReason },
}

impl Resolution {
    pub(crate) fn path(&self) -> &Path {
        match self {
            Resolution::File(path) => path,
            Resolution::Fallback { path, .. } => path,
        }
    }
}

fn is_valid_scheme(scheme: &str) -> bool {
    let mut chars = scheme.chars();
    matches!(chars.next(), Some(first) if first.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '+' | '-' | '.'))
}

fn content_base_url(scheme: &str, hostname: &str) -> Result<Url, url::ParseError> {
    // WebView2 only serves custom schemes through http://<scheme>.<host>.
    if cfg!(windows) {
        Url::parse(&format!("http://{scheme}.{hostname}"))
    } else {
        Url::parse(&format!("{scheme}://{hostname}"))
    }
}

// Drive letters and alternate data streams only exist on Windows.
fn is_unsafe_segment(segment: &str) -> bool {
    segment.contains(['\\', '\0']) || (cfg!(windows) && segment.contains(':'))
}

/// Splits a decoded request path into segments below the base directory.
/// `..` is clamped at the base; segments that could name another root are
/// rejected.
fn contained_segments(decoded: &str) -> Option<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            segment if is_unsafe_segment(segment) => return None,
            segment => segments.push(segment),
        }
    }
    Some(segments)
}

async fn existing_file(path: &Path) -> io::Result<Option<PathBuf>> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_file() => Ok(Some(path.to_path_buf())),
        Ok(_) => Ok(None),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) if error.kind() == io::ErrorKind::NotADirectory => Ok(None),
        Err(error) => Err(error),
    }
}

fn with_html_suffix(path: &Path) -> PathBuf {
    let mut raw = path.as_os_str().to_os_string();
    raw.push(".html");
    PathBuf::from(raw)
}

#[derive(Debug)]
pub(crate) struct StaticServer {
    options: ServeOptions,
    base_url: Url,
}

impl StaticServer {
    /// `options.directory` is resolved against `app_root` when relative.
    pub(crate) fn new(mut options: ServeOptions, app_root: &Path) -> Result<Self, ServeError> {
        if options.directory.as_os_str().is_empty() {
            return Err(ServeError::MissingDirectory);
        }
        if !is_valid_scheme(&options.scheme) {
            return Err(ServeError::InvalidScheme(options.scheme));
        }
        if options.directory.is_relative() {
            options.directory = app_root.join(&options.directory);
        }
        let base_url =
            content_base_url(&options.scheme, &options.hostname).map_err(|source| {
                ServeError::InvalidUrl {
                    scheme: options.scheme.clone(),
                    source,
                }
            })?;

        Ok(Self { options, base_url })
    }

    pub(crate) fn options(&self) -> &ServeOptions {
        &self.options
    }

    pub(crate) fn scheme(&self) -> &str {
        &self.options.scheme
    }

    pub(crate) fn directory(&self) -> &Path {
        &self.options.directory
    }

    pub(crate) fn scheme_privileges(&self) -> SchemePrivileges {
        SchemePrivileges {
            standard: true,
            secure: true,
            allow_service_workers: true,
            support_fetch_api: true,
            cors_enabled: self.options.is_cors_enabled,
            stream: true,
        }
    }

    pub(crate) fn index_fallback_path(&self) -> PathBuf {
        self.options
            .directory
            .join(format!("{}.html", self.options.file))
    }

    fn fallback(&self, request_path: &str, reason: FallbackReason) -> Resolution {
        match &reason {
            FallbackReason::Io(error) => log::warn!(
                target: LOG_TARGET_STATIC_SERVE,
                "i/o error resolving {request_path}, serving index: {error}"
            ),
            reason => log::debug!(
                target: LOG_TARGET_STATIC_SERVE,
                "{request_path} not served directly ({reason:?}), serving index"
            ),
        }
        Resolution::Fallback {
            path: self.index_fallback_path(),
            reason,
        }
    }

    /// Maps a request path to the file to serve: the literal file, then the
    /// same path with `.html`, then the index page.
    pub(crate) async fn resolve(&self, request_path: &str) -> Resolution {
        let decoded = match percent_decode_str(request_path).decode_utf8() {
            Ok(decoded) => decoded,
            Err(_) => return self.fallback(request_path, FallbackReason::InvalidPath),
        };
        let decoded = if decoded == "/" {
            format!("/{}", self.options.file)
        } else {
            decoded.into_owned()
        };

        let Some(segments) = contained_segments(&decoded) else {
            return self.fallback(request_path, FallbackReason::InvalidPath);
        };
        if segments.is_empty() {
            return self.fallback(request_path, FallbackReason::NotFound);
        }
        let candidate = segments
            .iter()
            .fold(self.options.directory.clone(), |path, segment| {
                path.join(segment)
            });

        let found = match existing_file(&candidate).await {
            Ok(Some(path)) => Some(path),
            Ok(None) => match existing_file(&with_html_suffix(&candidate)).await {
                Ok(found) => found,
                Err(error) => {
                    return self.fallback(request_path, FallbackReason::Io(error.to_string()))
                }
            },
            Err(error) => {
                return self.fallback(request_path, FallbackReason::Io(error.to_string()))
            }
        };
        let Some(path) = found else {
            return self.fallback(request_path, FallbackReason::NotFound);
        };

        match self.is_inside_directory(&path).await {
            Ok(true) => Resolution::File(path),
            Ok(false) => self.fallback(request_path, FallbackReason::Escaped),
            Err(error) => self.fallback(request_path, FallbackReason::Io(error.to_string())),
        }
    }

    // Catches symlinks that point out of the served directory.
    async fn is_inside_directory(&self, path: &Path) -> io::Result<bool> {
        let base = tokio::fs::canonicalize(&self.options.directory).await?;
        let target = tokio::fs::canonicalize(path).await?;
        Ok(target.starts_with(base))
    }

    /// `{scheme}://{hostname}[?params]`
    pub(crate) fn content_url(&self, query: &[(&str, &str)]) -> Url {
        let mut url = self.base_url.clone();
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    pub(crate) fn load_url<R: Runtime>(
        &self,
        window: &WebviewWindow<R>,
        query: &[(&str, &str)],
    ) -> Result<(), String> {
        let url = self.content_url(query);
        window
            .navigate(url.clone())
            .map_err(|error| format!("Failed to load {url} in window {}: {error}", window.label()))
    }
}
