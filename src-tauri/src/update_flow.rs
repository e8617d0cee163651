use async_trait::async_trait;

use crate::{custom_config::CustomConfig, update_feed::FeedDescriptor};

pub(crate) const MISSING_GITHUB_CONFIG_LOG: &str =
    "GitHub configuration is missing for auto-updater.";
pub(crate) const BUNDLED_PUBKEY_LOG: &str =
    "no updater pubkey in shell config; downloads are verified against tauri.conf.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AvailableUpdate {
    pub(crate) current_version: String,
    pub(crate) version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct UpdatePromptSpec {
    pub(crate) title: &'static str,
    pub(crate) message: &'static str,
    pub(crate) confirm: &'static str,
    pub(crate) cancel: &'static str,
}

pub(crate) const UPDATE_AVAILABLE_PROMPT: UpdatePromptSpec = UpdatePromptSpec {
    title: "Update Available",
    message: "A new version of the application is available. Do you want to update now?",
    confirm: "Update",
    cancel: "Cancel",
};

pub(crate) const UPDATE_READY_PROMPT: UpdatePromptSpec = UpdatePromptSpec {
    title: "Update Ready",
    message: "The update has been downloaded. Restart the application to apply the updates.",
    confirm: "Restart",
    cancel: "Later",
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UpdateOutcome {
    UpToDate,
    CheckFailed(String),
    Declined,
    DownloadFailed(String),
    Deferred,
    InstallFailed(String),
    Installed,
}

/// Update delivery. Implementations keep the checked update between calls.
#[async_trait]
pub(crate) trait UpdateFeed: Send + Sync {
    async fn check(&self) -> Result<Option<AvailableUpdate>, String>;
    async fn download(&self) -> Result<(), String>;
    fn install_and_restart(&self) -> Result<(), String>;
}

/// Waits for the user's answer; there is no timeout.
#[async_trait]
pub(crate) trait UpdatePrompt: Send + Sync {
    async fn ask(&self, spec: UpdatePromptSpec) -> bool;
}

pub(crate) trait MainWindowControl: Send + Sync {
    fn show_main_window(&self);
}

/// Derives the feed from the config and hands it to `configure`. Without a
/// complete GitHub block nothing is configured and one line is logged.
pub(crate) fn setup_auto_updater<C, F>(
    config: &CustomConfig,
    configure: C,
    log: F,
) -> Option<FeedDescriptor>
where
    C: FnOnce(&FeedDescriptor) -> Result<(), String>,
    F: Fn(&str),
{
    let descriptor = match config.github.as_ref().map(|github| github.feed_descriptor()) {
        Some(Ok(descriptor)) => descriptor,
        Some(Err(_)) | None => {
            log(MISSING_GITHUB_CONFIG_LOG);
            return None;
        }
    };

    if descriptor.pubkey.is_none() {
        log(BUNDLED_PUBKEY_LOG);
    }

    if let Err(error) = configure(&descriptor) {
        log(&format!("Failed to configure update feed: {error}"));
        return None;
    }
    Some(descriptor)
}

/// Available -> Update/Cancel -> download -> Restart/Later -> install.
/// Declining at either prompt brings the main window back.
pub(crate) async fn run_update_flow<U, P, W, F>(
    feed: &U,
    prompt: &P,
    window: &W,
    log: F,
) -> UpdateOutcome
where
    U: UpdateFeed + ?Sized,
    P: UpdatePrompt + ?Sized,
    W: MainWindowControl + ?Sized,
    F: Fn(&str),
{
    let update = match feed.check().await {
        Ok(Some(update)) => update,
        Ok(None) => {
            log("no update available");
            return UpdateOutcome::UpToDate;
        }
        Err(error) => {
            log(&format!("Failed to check for updates: {error}"));
            return UpdateOutcome::CheckFailed(error);
        }
    };
    log(&format!(
        "update available: current_version={} latest_version={}",
        update.current_version, update.version
    ));

    if !prompt.ask(UPDATE_AVAILABLE_PROMPT).await {
        log("user postponed the update");
        window.show_main_window();
        return UpdateOutcome::Declined;
    }

    if let Err(error) = feed.download().await {
        log(&format!("Error downloading update: {error}"));
        return UpdateOutcome::DownloadFailed(error);
    }
    log(&format!("update {} downloaded", update.version));

    if !prompt.ask(UPDATE_READY_PROMPT).await {
        log("user chose to restart later");
        window.show_main_window();
        return UpdateOutcome::Deferred;
    }

    match feed.install_and_restart() {
        Ok(()) => {
            log(&format!("update {} installed, restarting", update.version));
            UpdateOutcome::Installed
        }
        Err(error) => {
            log(&format!("Error installing update: {error}"));
            UpdateOutcome::InstallFailed(error)
        }
    }
}
