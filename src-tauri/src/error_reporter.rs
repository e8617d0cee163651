use std::{
    error::Error,
    panic,
    sync::{Arc, OnceLock},
};

use tauri::{AppHandle, Runtime};
use tauri_plugin_dialog::{DialogExt, MessageDialogKind};

use crate::{
    error_report::{ErrorReport, FaultKind},
    LOG_TARGET_ERROR_REPORTER,
};

pub(crate) const LOGGER_FAILURE_TITLE: &str = "The `logger` option function threw an error";

pub(crate) type ErrorLogger = Arc<dyn Fn(&ErrorReport) -> Result<(), String> + Send + Sync>;

/// Where reports end up in front of the user.
pub(crate) trait ErrorPresenter: Send + Sync {
    fn show_message_box(&self, title: &str, message: &str, detail: &str);
    fn show_error_box(&self, title: &str, content: &str);
}

#[derive(Clone)]
pub(crate) struct ErrorHandlerOptions {
    pub(crate) logger: ErrorLogger,
    pub(crate) show_dialog: bool,
    pub(crate) title: String,
}

fn log_report(report: &ErrorReport) -> Result<(), String> {
    log::error!(
        target: LOG_TARGET_ERROR_REPORTER,
        "{:?}: {}\n{}",
        report.kind,
        report.message,
        report.stack.as_deref().unwrap_or_default()
    );
    Ok(())
}

impl Default for ErrorHandlerOptions {
    fn default() -> Self {
        Self {
            logger: Arc::new(log_report),
            show_dialog: true,
            title: "Error".to_string(),
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct ErrorHandlerOverrides {
    pub(crate) logger: Option<ErrorLogger>,
    pub(crate) show_dialog: Option<bool>,
    pub(crate) title: Option<String>,
}

impl ErrorHandlerOptions {
    fn merged(&self, overrides: ErrorHandlerOverrides) -> Self {
        Self {
            logger: overrides.logger.unwrap_or_else(|| self.logger.clone()),
            show_dialog: overrides.show_dialog.unwrap_or(self.show_dialog),
            title: overrides.title.unwrap_or_else(|| self.title.clone()),
        }
    }
}

/// Process-wide fault reporting context. Created once at startup and shared
/// by handle; options are frozen by the first `install`.
pub(crate) struct ErrorReporter {
    app_name: String,
    defaults: ErrorHandlerOptions,
    installed: OnceLock<ErrorHandlerOptions>,
    presenter: Arc<dyn ErrorPresenter>,
}

impl ErrorReporter {
    pub(crate) fn new(app_name: impl Into<String>, presenter: Arc<dyn ErrorPresenter>) -> Self {
        Self {
            app_name: app_name.into(),
            defaults: ErrorHandlerOptions::default(),
            installed: OnceLock::new(),
            presenter,
        }
    }

    pub(crate) fn is_installed(&self) -> bool {
        self.installed.get().is_some()
    }

    pub(crate) fn options(&self) -> &ErrorHandlerOptions {
        self.installed.get().unwrap_or(&self.defaults)
    }

    /// Freezes the merged options. Only the first call has any effect.
    pub(crate) fn configure(&self, overrides: ErrorHandlerOverrides) -> bool {
        self.installed.set(self.defaults.merged(overrides)).is_ok()
    }

    /// `configure` plus a panic hook routing uncaught panics into
    /// `handle_error`. Repeated calls are no-ops returning false.
    pub(crate) fn install(self: &Arc<Self>, overrides: ErrorHandlerOverrides) -> bool {
        if !self.configure(overrides) {
            return false;
        }

        let reporter = Arc::clone(self);
        let previous_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            previous_hook(info);
            let report = ErrorReport::from_panic(info);
            reporter.handle_error(Some(FaultKind::UncaughtError.default_title()), &report);
        }));
        true
    }

    /// Logs the report and, when enabled, shows it in a dialog.
    pub(crate) fn handle_error(&self, title: Option<&str>, report: &ErrorReport) {
        let options = self.options();
        if let Err(logger_error) = (options.logger)(report) {
            self.presenter
                .show_error_box(LOGGER_FAILURE_TITLE, &logger_error);
            return;
        }

        if options.show_dialog {
            let title = title
                .map(str::to_string)
                .or_else(|| report.title.clone())
                .unwrap_or_else(|| format!("{} encountered an error", self.app_name));
            self.presenter.show_message_box(
                &title,
                &report.message,
                report.stack.as_deref().unwrap_or_default(),
            );
        }
    }

    /// Manual report from Rust code.
    pub(crate) fn log_error(&self, error: &(dyn Error + 'static), overrides: ErrorHandlerOverrides) {
        let title = overrides
            .title
            .unwrap_or_else(|| self.options().title.clone());
        let report = ErrorReport::from_error(error, FaultKind::Manual);
        self.handle_error(Some(&title), &report);
    }
}

/// Presents reports with native dialogs once the app handle exists. Before
/// that the log plugin is not running either, so reports go to stderr.
pub(crate) struct DialogPresenter<R: Runtime> {
    app_handle: OnceLock<AppHandle<R>>,
}

impl<R: Runtime> DialogPresenter<R> {
    pub(crate) fn new() -> Self {
        Self {
            app_handle: OnceLock::new(),
        }
    }

    pub(crate) fn attach(&self, app_handle: AppHandle<R>) {
        if self.app_handle.set(app_handle).is_err() {
            log::debug!(
                target: LOG_TARGET_ERROR_REPORTER,
                "dialog presenter already attached"
            );
        }
    }
}

impl<R: Runtime> ErrorPresenter for DialogPresenter<R> {
    fn show_message_box(&self, title: &str, message: &str, detail: &str) {
        let Some(app_handle) = self.app_handle.get() else {
            eprintln!("{title}: {message}\n{detail}");
            return;
        };

        let text = if detail.is_empty() {
            message.to_string()
        } else {
            format!("{message}\n\n{detail}")
        };
        app_handle
            .dialog()
            .message(text)
            .title(title)
            .kind(MessageDialogKind::Error)
            .show(|_| {});
    }

    fn show_error_box(&self, title: &str, content: &str) {
        let Some(app_handle) = self.app_handle.get() else {
            eprintln!("{title}: {content}");
            return;
        };

        app_handle
            .dialog()
            .message(content)
            .title(title)
            .kind(MessageDialogKind::Error)
            .show(|_| {});
    }
}
