use std::sync::Mutex;

use async_trait::async_trait;
use tauri::{
    http::{HeaderMap, HeaderValue},
    AppHandle, Runtime,
};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogKind};
use tauri_plugin_updater::{Update, Updater, UpdaterExt};
use url::Url;

use crate::{
    append_update_log,
    custom_config::CustomConfig,
    main_window,
    update_feed::FeedDescriptor,
    update_flow::{
        run_update_flow, setup_auto_updater, AvailableUpdate, MainWindowControl, UpdateFeed,
        UpdatePrompt, UpdatePromptSpec,
    },
    GITHUB_USER_AGENT,
};

fn updater_header_map(descriptor: &FeedDescriptor) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    for (name, value) in descriptor.updater_headers() {
        let value = HeaderValue::from_str(&value)
            .map_err(|error| format!("Invalid {name} header for updater: {error}"))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn build_updater<R: Runtime>(
    app_handle: &AppHandle<R>,
    descriptor: &FeedDescriptor,
    endpoint: Url,
) -> Result<Updater, String> {
    let mut builder = app_handle
        .updater_builder()
        .endpoints(vec![endpoint])
        .map_err(|error| format!("Failed to set update endpoint: {error}"))?
        .headers(updater_header_map(descriptor)?);
    if let Some(pubkey) = &descriptor.pubkey {
        builder = builder.pubkey(pubkey.clone());
    }
    builder
        .build()
        .map_err(|error| format!("Failed to initialize updater: {error}"))
}

pub(crate) struct TauriUpdateFeed<R: Runtime> {
    app_handle: AppHandle<R>,
    descriptor: FeedDescriptor,
    client: reqwest::Client,
    pending: Mutex<Option<Update>>,
    downloaded: Mutex<Option<(Update, Vec<u8>)>>,
}

impl<R: Runtime> TauriUpdateFeed<R> {
    pub(crate) fn new(app_handle: &AppHandle<R>, descriptor: &FeedDescriptor) -> Result<Self, String> {
        updater_header_map(descriptor)?;
        let client = reqwest::Client::builder()
            .user_agent(GITHUB_USER_AGENT)
            .build()
            .map_err(|error| format!("Failed to create release client: {error}"))?;
        Ok(Self {
            app_handle: app_handle.clone(),
            descriptor: descriptor.clone(),
            client,
            pending: Mutex::new(None),
            downloaded: Mutex::new(None),
        })
    }
}

#[async_trait]
impl<R: Runtime> UpdateFeed for TauriUpdateFeed<R> {
    async fn check(&self) -> Result<Option<AvailableUpdate>, String> {
        let endpoint = self
            .descriptor
            .resolve_endpoint(&self.client)
            .await
            .map_err(|error| error.to_string())?;
        append_update_log(&format!("checking for updates at {endpoint}"));
        let updater = build_updater(&self.app_handle, &self.descriptor, endpoint)?;
        let update = updater.check().await.map_err(|error| error.to_string())?;
        let Some(update) = update else {
            return Ok(None);
        };

        let available = AvailableUpdate {
            current_version: update.current_version.clone(),
            version: update.version.clone(),
        };
        *self
            .pending
            .lock()
            .map_err(|_| "Update state lock poisoned.".to_string())? = Some(update);
        Ok(Some(available))
    }

    async fn download(&self) -> Result<(), String> {
        let update = self
            .pending
            .lock()
            .map_err(|_| "Update state lock poisoned.".to_string())?
            .take()
            .ok_or_else(|| "No update has been checked.".to_string())?;

        let bytes = update
            .download(|_, _| {}, || {})
            .await
            .map_err(|error| error.to_string())?;
        *self
            .downloaded
            .lock()
            .map_err(|_| "Update state lock poisoned.".to_string())? = Some((update, bytes));
        Ok(())
    }

    fn install_and_restart(&self) -> Result<(), String> {
        let (update, bytes) = self
            .downloaded
            .lock()
            .map_err(|_| "Update state lock poisoned.".to_string())?
            .take()
            .ok_or_else(|| "No update has been downloaded.".to_string())?;

        update.install(&bytes).map_err(|error| error.to_string())?;
        self.app_handle.request_restart();
        Ok(())
    }
}

pub(crate) struct DialogUpdatePrompt<R: Runtime> {
    app_handle: AppHandle<R>,
}

#[async_trait]
impl<R: Runtime> UpdatePrompt for DialogUpdatePrompt<R> {
    async fn ask(&self, spec: UpdatePromptSpec) -> bool {
        let (sender, receiver) = tokio::sync::oneshot::channel();
        self.app_handle
            .dialog()
            .message(spec.message)
            .title(spec.title)
            .kind(MessageDialogKind::Info)
            .buttons(MessageDialogButtons::OkCancelCustom(
                spec.confirm.to_string(),
                spec.cancel.to_string(),
            ))
            .show(move |accepted| {
                let _ = sender.send(accepted);
            });
        receiver.await.unwrap_or(false)
    }
}

pub(crate) struct AppMainWindow<R: Runtime> {
    app_handle: AppHandle<R>,
}

impl<R: Runtime> MainWindowControl for AppMainWindow<R> {
    fn show_main_window(&self) {
        main_window::show_main_window(&self.app_handle, append_update_log);
    }
}

/// Configures the feed from `config` and runs the update dialogs in the
/// background. An incomplete GitHub block only produces a log line.
pub(crate) fn spawn_auto_update<R: Runtime>(
    app_handle: &AppHandle<R>,
    config: &CustomConfig,
) -> Result<(), String> {
    let mut feed = None;
    let mut configure_error = None;
    setup_auto_updater(
        config,
        |descriptor| match TauriUpdateFeed::new(app_handle, descriptor) {
            Ok(created) => {
                feed = Some(created);
                Ok(())
            }
            Err(error) => {
                configure_error = Some(error.clone());
                Err(error)
            }
        },
        append_update_log,
    );
    if let Some(error) = configure_error {
        return Err(error);
    }
    let Some(feed) = feed else {
        return Ok(());
    };

    let prompt = DialogUpdatePrompt {
        app_handle: app_handle.clone(),
    };
    let window = AppMainWindow {
        app_handle: app_handle.clone(),
    };
    tauri::async_runtime::spawn(async move {
        let outcome = run_update_flow(&feed, &prompt, &window, append_update_log).await;
        append_update_log(&format!("update flow finished: {outcome:?}"));
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tauri::http::header::{ACCEPT, AUTHORIZATION};

    fn descriptor(private: bool, token: &str) -> FeedDescriptor {
        FeedDescriptor {
            provider: "github".to_string(),
            owner: "acme".to_string(),
            repo: "shell".to_string(),
            private,
            token: token.to_string(),
            pubkey: None,
        }
    }

    #[test]
    fn private_feed_headers_reach_the_updater() {
        let headers = updater_header_map(&descriptor(true, "t")).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Bearer t");
        assert_eq!(headers[ACCEPT], "application/octet-stream");

        assert!(updater_header_map(&descriptor(false, "t")).unwrap().is_empty());
    }

    #[test]
    fn token_with_control_characters_is_rejected() {
        let error = updater_header_map(&descriptor(true, "bad\ntoken")).unwrap_err();
        assert!(error.starts_with("Invalid authorization header"));
    }
}
