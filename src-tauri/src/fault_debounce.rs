use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use crate::error_report::{ErrorReport, FaultKind};

type Forward = Arc<dyn Fn(ErrorReport) + Send + Sync>;

struct PendingFault {
    generation: u64,
    report: ErrorReport,
}

/// Trailing-edge debounce of webview faults, one window per fault kind.
/// Each report restarts its kind's window and replaces the pending report;
/// the last one is forwarded when the window elapses.
pub(crate) struct FaultDebouncer {
    window: Duration,
    forward: Forward,
    pending: Arc<Mutex<HashMap<FaultKind, PendingFault>>>,
}

impl FaultDebouncer {
    pub(crate) fn new(window: Duration, forward: Forward) -> Self {
        Self {
            window,
            forward,
            pending: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Must be called from within a tokio runtime.
    pub(crate) fn push(&self, report: ErrorReport) {
        if report.kind == FaultKind::Manual {
            (self.forward)(report);
            return;
        }

        let kind = report.kind;
        let generation = {
            let Ok(mut pending) = self.pending.lock() else {
                return;
            };
            let generation = pending
                .get(&kind)
                .map(|fault| fault.generation.wrapping_add(1))
                .unwrap_or(0);
            pending.insert(kind, PendingFault { generation, report });
            generation
        };

        let window = self.window;
        let pending = Arc::clone(&self.pending);
        let forward = Arc::clone(&self.forward);
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let ready = {
                let Ok(mut pending) = pending.lock() else {
                    return;
                };
                match pending.get(&kind) {
                    Some(fault) if fault.generation == generation => {
                        pending.remove(&kind).map(|fault| fault.report)
                    }
                    _ => None,
                }
            };
            if let Some(report) = ready {
                forward(report);
            }
        });
    }
}
