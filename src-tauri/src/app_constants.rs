use std::time::Duration;

pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const MAIN_WINDOW_TITLE: &str = "App Shell";

pub(crate) const DEFAULT_SCHEME: &str = "app";
pub(crate) const DEFAULT_HOSTNAME: &str = "localhost";
pub(crate) const DEFAULT_INDEX_FILE: &str = "index";
pub(crate) const DEFAULT_WEB_DIRECTORY: &str = "app";
pub(crate) const DEFAULT_DEEP_LINK_SCHEME: &str = "appshell";

pub(crate) const CUSTOM_CONFIG_FILE: &str = "shell-config.json";
pub(crate) const DESKTOP_LOG_FILE: &str = "app-shell";
pub(crate) const GITHUB_USER_AGENT: &str = "app-shell";

// Name of the Tauri command the webview invokes to report faults.
pub(crate) const ERROR_HANDLER_CHANNEL: &str = "report_error";
pub(crate) const FAULT_DEBOUNCE_WINDOW: Duration = Duration::from_millis(200);

pub(crate) const LOG_TARGET_STARTUP: &str = "startup";
pub(crate) const LOG_TARGET_DESKTOP: &str = "desktop";
pub(crate) const LOG_TARGET_UPDATER: &str = "updater";
pub(crate) const LOG_TARGET_STATIC_SERVE: &str = "static_serve";
pub(crate) const LOG_TARGET_ERROR_REPORTER: &str = "error_reporter";

// Event the main window receives for every opened deep link.
pub(crate) const DEEP_LINK_EVENT: &str = "appUrlOpen";
