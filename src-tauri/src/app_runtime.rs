use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    sync::Arc,
};

use tauri::{Manager, PackageInfo, RunEvent, Wry};

use crate::{
    append_startup_log,
    custom_config::{load_custom_config, CustomConfig},
    deep_link,
    error_bridge::{self, ErrorBridgeState},
    error_report::{ErrorReport, FaultKind},
    error_reporter::{DialogPresenter, ErrorHandlerOverrides, ErrorPresenter, ErrorReporter},
    lifecycle, logging, main_window, serve_protocol,
    static_serve::StaticServer,
    updater_runtime, ShellState, CUSTOM_CONFIG_FILE,
};

const INITIALIZATION_ERROR_TITLE: &str = "Initialization Error";

fn resolve_app_root(package_info: &PackageInfo, early_log: &mut Vec<String>) -> PathBuf {
    match tauri::utils::platform::resource_dir(package_info, &tauri::Env::default()) {
        Ok(dir) => dir,
        Err(error) => {
            early_log.push(format!(
                "failed to resolve resource directory, using working directory: {error}"
            ));
            PathBuf::from(".")
        }
    }
}

// The user's copy in the app config dir wins over the bundled one.
fn config_candidates(identifier: &str, app_root: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(config_dir) = dirs::config_dir() {
        candidates.push(config_dir.join(identifier).join(CUSTOM_CONFIG_FILE));
    }
    candidates.push(app_root.join(CUSTOM_CONFIG_FILE));
    candidates
}

fn load_startup_config(
    identifier: &str,
    app_root: &Path,
    early_log: &mut Vec<String>,
) -> CustomConfig {
    let lines = RefCell::new(Vec::new());
    let config = load_custom_config(&config_candidates(identifier, app_root), |line| {
        lines.borrow_mut().push(line.to_string())
    });
    early_log.extend(lines.into_inner());
    config
}

pub(crate) fn run() {
    let context = tauri::generate_context!();
    let presenter = Arc::new(DialogPresenter::<Wry>::new());
    let reporter = Arc::new(ErrorReporter::new(
        context.package_info().name.clone(),
        Arc::clone(&presenter) as Arc<dyn ErrorPresenter>,
    ));
    reporter.install(ErrorHandlerOverrides::default());

    // The log plugin only starts with the app; buffer until then.
    let mut early_log = vec!["desktop process starting".to_string()];
    let app_root = resolve_app_root(context.package_info(), &mut early_log);
    let config = load_startup_config(&context.config().identifier, &app_root, &mut early_log);
    if let Some(key) = config.key.as_deref() {
        early_log.push(format!("shell config key: {key}"));
    }

    let server = match StaticServer::new(config.serve_options(), &app_root) {
        Ok(server) => Arc::new(server),
        Err(error) => {
            reporter.log_error(
                &error,
                ErrorHandlerOverrides {
                    title: Some(INITIALIZATION_ERROR_TITLE.to_string()),
                    ..ErrorHandlerOverrides::default()
                },
            );
            std::process::exit(1);
        }
    };
    early_log.push(format!(
        "serving {} from {}",
        server.content_url(&[]),
        server.directory().display()
    ));

    let builder = tauri::Builder::default()
        .plugin(logging::build_log_plugin())
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_deep_link::init())
        .plugin(tauri_plugin_updater::Builder::new().build())
        .manage(ErrorBridgeState::new(Arc::clone(&reporter)))
        .manage(ShellState {
            server: Arc::clone(&server),
            config,
        })
        .invoke_handler(tauri::generate_handler![error_bridge::report_error]);

    serve_protocol::register(builder, Arc::clone(&server))
        .setup(move |app| {
            let app_handle = app.handle().clone();
            presenter.attach(app_handle.clone());
            for line in &early_log {
                append_startup_log(line);
            }
            append_startup_log(&format!(
                "error reporter installed: {}",
                reporter.is_installed()
            ));

            append_startup_log(&format!(
                "content security policy for {}: {}",
                server.scheme(),
                serve_protocol::content_security_policy(server.scheme(), cfg!(debug_assertions))
            ));

            if let Err(error) = main_window::init_app_shell(&app_handle, &server, append_startup_log)
            {
                append_startup_log(&format!("failed to initialize app shell: {error}"));
                reporter.handle_error(
                    Some(INITIALIZATION_ERROR_TITLE),
                    &ErrorReport::new(FaultKind::Manual, error),
                );
            }

            let state = app_handle.state::<ShellState>();
            if let Some(scheme) = state.config.deep_link_scheme() {
                deep_link::setup_deep_linking(&app_handle, &scheme);
            }

            if let Err(error) = updater_runtime::spawn_auto_update(&app_handle, &state.config) {
                append_startup_log(&format!("failed to start auto-updater: {error}"));
                reporter.handle_error(
                    Some(INITIALIZATION_ERROR_TITLE),
                    &ErrorReport::new(FaultKind::Manual, error),
                );
            }

            Ok(())
        })
        .build(context)
        .expect("error while building tauri application")
        .run(|app_handle, event| match event {
            RunEvent::ExitRequested { code, api, .. } => {
                lifecycle::handle_exit_requested(app_handle, code, &api);
            }
            #[cfg(target_os = "macos")]
            RunEvent::Reopen { .. } => {
                lifecycle::handle_reopen(app_handle);
            }
            _ => {}
        });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_is_the_last_candidate() {
        let candidates = config_candidates("dev.appshell.desktop", Path::new("/opt/app"));
        assert_eq!(
            candidates.last(),
            Some(&PathBuf::from("/opt/app").join(CUSTOM_CONFIG_FILE))
        );
        if candidates.len() == 2 {
            let expected = Path::new("dev.appshell.desktop").join(CUSTOM_CONFIG_FILE);
            assert!(candidates[0].ends_with(expected));
        }
    }

    #[test]
    fn startup_config_lines_are_buffered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CUSTOM_CONFIG_FILE),
            r#"{"server":{"scheme":"shell"}}"#,
        )
        .unwrap();
        let mut early_log = Vec::new();

        let config = load_startup_config("dev.appshell.test-missing", dir.path(), &mut early_log);

        assert_eq!(config.serve_options().scheme, "shell");
        assert!(early_log
            .iter()
            .any(|line| line.starts_with("loaded shell config")));
    }
}
