#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_runtime;
mod app_types;
mod custom_config;
mod deep_link;
mod error_bridge;
mod error_report;
mod error_reporter;
mod fault_debounce;
mod lifecycle;
mod logging;
mod main_window;
mod serve_protocol;
mod static_serve;
mod update_feed;
mod update_flow;
mod updater_runtime;

pub(crate) use app_constants::*;
pub(crate) use app_types::ShellState;
pub(crate) use logging::{append_desktop_log, append_startup_log, append_update_log};

fn main() {
    app_runtime::run();
}
