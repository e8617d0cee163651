use chrono::Local;
use tauri::{plugin::TauriPlugin, Runtime};
use tauri_plugin_log::{Target, TargetKind};

use crate::{
    DESKTOP_LOG_FILE, LOG_TARGET_DESKTOP, LOG_TARGET_STARTUP, LOG_TARGET_UPDATER,
};

fn default_level() -> log::LevelFilter {
    if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Log sink for the whole process: stdout plus a file in the platform log
/// directory. Must be the first plugin on the builder so startup lines land.
pub(crate) fn build_log_plugin<R: Runtime>() -> TauriPlugin<R> {
    tauri_plugin_log::Builder::new()
        .clear_targets()
        .targets([
            Target::new(TargetKind::Stdout),
            Target::new(TargetKind::LogDir {
                file_name: Some(DESKTOP_LOG_FILE.to_string()),
            }),
        ])
        .level(default_level())
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] [{}] [{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .build()
}

pub(crate) fn append_startup_log(message: &str) {
    log::info!(target: LOG_TARGET_STARTUP, "{message}");
}

pub(crate) fn append_desktop_log(message: &str) {
    log::info!(target: LOG_TARGET_DESKTOP, "{message}");
}

pub(crate) fn append_update_log(message: &str) {
    log::info!(target: LOG_TARGET_UPDATER, "{message}");
}

