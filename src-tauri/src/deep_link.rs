use tauri::{AppHandle, Emitter, Runtime};
use tauri_plugin_deep_link::DeepLinkExt;
use url::Url;

use crate::{append_desktop_log, main_window, DEEP_LINK_EVENT, MAIN_WINDOW_LABEL};

/// Links addressed to `scheme`; anything else the OS hands over is ignored.
pub(crate) fn links_for_scheme(urls: &[Url], scheme: &str) -> Vec<String> {
    urls.iter()
        .filter(|url| url.scheme().eq_ignore_ascii_case(scheme))
        .map(|url| url.to_string())
        .collect()
}

fn forward_links<R: Runtime>(app_handle: &AppHandle<R>, scheme: &str, urls: &[Url]) {
    let links = links_for_scheme(urls, scheme);
    if links.is_empty() {
        return;
    }

    main_window::show_main_window(app_handle, append_desktop_log);
    for link in links {
        append_desktop_log(&format!("deep link opened: {link}"));
        if let Err(error) = app_handle.emit_to(MAIN_WINDOW_LABEL, DEEP_LINK_EVENT, link) {
            append_desktop_log(&format!("failed to forward deep link: {error}"));
        }
    }
}

/// Registers `scheme` with the OS and forwards opened links to the main
/// window as `appUrlOpen` events. macOS takes the scheme from the bundle, so
/// a registration error there is only logged.
pub(crate) fn setup_deep_linking<R: Runtime>(app_handle: &AppHandle<R>, scheme: &str) {
    let deep_link = app_handle.deep_link();
    match deep_link.register(scheme) {
        Ok(()) => append_desktop_log(&format!("registered deep link scheme {scheme}")),
        Err(error) => append_desktop_log(&format!(
            "could not register deep link scheme {scheme}: {error}"
        )),
    }

    let handle = app_handle.clone();
    let owned_scheme = scheme.to_string();
    deep_link.on_open_url(move |event| {
        forward_links(&handle, &owned_scheme, &event.urls());
    });

    match deep_link.get_current() {
        Ok(Some(urls)) => forward_links(app_handle, scheme, &urls),
        Ok(None) => {}
        Err(error) => append_desktop_log(&format!("failed to read launch deep link: {error}")),
    }
}
