use std::sync::Arc;

use crate::{custom_config::CustomConfig, static_serve::StaticServer};

/// Startup products shared with lifecycle handlers.
pub(crate) struct ShellState {
    pub(crate) server: Arc<StaticServer>,
    pub(crate) config: CustomConfig,
}
