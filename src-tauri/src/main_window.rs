use tauri::{AppHandle, Manager, Runtime, WebviewUrl, WebviewWindow, WebviewWindowBuilder};
use url::Url;

use crate::{
    error_bridge::renderer_bridge_script, static_serve::StaticServer, MAIN_WINDOW_LABEL,
    MAIN_WINDOW_TITLE,
};

const BLANK_PAGE: &str = "about:blank";

pub(crate) fn show_main_window<R: Runtime, F>(app_handle: &AppHandle<R>, log: F)
where
    F: Fn(&str),
{
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        log("show_main_window skipped: main window not found");
        return;
    };

    if let Err(error) = window.unminimize() {
        log(&format!("failed to unminimize main window: {error}"));
    }
    if let Err(error) = window.show() {
        log(&format!("failed to show main window: {error}"));
    }
    if let Err(error) = window.set_focus() {
        log(&format!("failed to focus main window: {error}"));
    }
}

pub(crate) fn is_main_window_destroyed<R: Runtime>(app_handle: &AppHandle<R>) -> bool {
    app_handle.get_webview_window(MAIN_WINDOW_LABEL).is_none()
}

fn create_main_window<R: Runtime>(app_handle: &AppHandle<R>) -> Result<WebviewWindow<R>, String> {
    let blank = Url::parse(BLANK_PAGE)
        .map_err(|error| format!("Failed to parse {BLANK_PAGE}: {error}"))?;
    let bridge_script = renderer_bridge_script();

    WebviewWindowBuilder::new(app_handle, MAIN_WINDOW_LABEL, WebviewUrl::External(blank))
        .title(MAIN_WINDOW_TITLE)
        .inner_size(1200.0, 800.0)
        .min_inner_size(640.0, 480.0)
        .visible(false)
        .initialization_script(bridge_script.as_str())
        .build()
        .map_err(|error| format!("Failed to create main window: {error}"))
}

/// Creates the main window when needed and loads the bundled content into
/// it through the custom scheme.
pub(crate) fn init_app_shell<R: Runtime, F>(
    app_handle: &AppHandle<R>,
    server: &StaticServer,
    log: F,
) -> Result<(), String>
where
    F: Fn(&str),
{
    let window = match app_handle.get_webview_window(MAIN_WINDOW_LABEL) {
        Some(window) => window,
        None => {
            log("creating main window");
            create_main_window(app_handle)?
        }
    };

    server.load_url(&window, &[])?;
    log(&format!("main window loading {}", server.content_url(&[])));
    show_main_window(app_handle, &log);
    Ok(())
}
