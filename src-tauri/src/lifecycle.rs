use tauri::{AppHandle, ExitRequestApi, Manager, Runtime};

use crate::{append_desktop_log, main_window, ShellState};

/// macOS apps stay alive without windows until the user quits explicitly.
pub(crate) fn should_quit_when_all_windows_closed(os: &str) -> bool {
    os != "macos"
}

/// `code` is `None` when the exit comes from the last window closing.
pub(crate) fn handle_exit_requested<R: Runtime>(
    app_handle: &AppHandle<R>,
    code: Option<i32>,
    api: &ExitRequestApi,
) {
    if code.is_none() && !should_quit_when_all_windows_closed(std::env::consts::OS) {
        append_desktop_log(&format!(
            "all windows closed, {} keeps running until an explicit quit",
            app_handle.package_info().name
        ));
        api.prevent_exit();
        return;
    }

    append_desktop_log(&format!("exit requested with code {code:?}"));
}

/// Rebuilds the shell when the dock icon is clicked after the main window
/// was closed.
pub(crate) fn handle_reopen<R: Runtime>(app_handle: &AppHandle<R>) {
    if !main_window::is_main_window_destroyed(app_handle) {
        return;
    }

    let Some(state) = app_handle.try_state::<ShellState>() else {
        append_desktop_log("reopen skipped: shell state unavailable");
        return;
    };
    if let Err(error) = main_window::init_app_shell(app_handle, &state.server, append_desktop_log)
    {
        append_desktop_log(&format!("failed to re-initialize app shell: {error}"));
    }
}
