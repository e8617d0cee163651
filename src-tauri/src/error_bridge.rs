use std::sync::Arc;

use serde_json::Value;
use tauri::State;

use crate::{
    error_report::{ErrorReport, FaultKind},
    error_reporter::ErrorReporter,
    fault_debounce::FaultDebouncer,
    ERROR_HANDLER_CHANNEL, FAULT_DEBOUNCE_WINDOW, LOG_TARGET_ERROR_REPORTER,
};

const CHANNEL_PLACEHOLDER: &str = "__ERROR_CHANNEL__";
const DEBOUNCE_PLACEHOLDER: &str = "__DEBOUNCE_MS__";

// Installed into every page of the main window. Faults are reduced to plain
// strings before crossing the boundary, so the payload is always cloneable.
const RENDERER_BRIDGE_TEMPLATE: &str = r#"
(function () {
  if (window.__APP_SHELL__ && window.__APP_SHELL__.installed) return;

  var channel = "__ERROR_CHANNEL__";
  var debounceMs = __DEBOUNCE_MS__;
  var pending = {};

  function toText(value) {
    if (value === undefined || value === null) return "";
    try {
      return typeof value === "string" ? value : String(value);
    } catch (_) {
      return "";
    }
  }

  function toReport(kind, fault, title) {
    var isObject = fault !== null && typeof fault === "object";
    return {
      kind: kind,
      title: title ? toText(title) : null,
      message: toText(isObject && "message" in fault ? fault.message : fault),
      stack: isObject && "stack" in fault ? toText(fault.stack) : null
    };
  }

  function send(report) {
    var internals = window.__TAURI_INTERNALS__;
    if (!internals || typeof internals.invoke !== "function") return Promise.resolve();
    return internals.invoke(channel, { report: report }).catch(function (reason) {
      console.error("[app-shell] error report rejected:", reason);
    });
  }

  // Trailing debounce per kind: a burst of faults sends only the last one.
  function sendDebounced(report) {
    clearTimeout(pending[report.kind]);
    pending[report.kind] = setTimeout(function () {
      delete pending[report.kind];
      send(report);
    }, debounceMs);
  }

  window.addEventListener("error", function (event) {
    event.preventDefault();
    sendDebounced(toReport("uncaughtError", event.error || event.message || event));
  });

  window.addEventListener("unhandledrejection", function (event) {
    event.preventDefault();
    sendDebounced(toReport("unhandledRejection", event.reason));
  });

  window.__APP_SHELL__ = {
    installed: true,
    logError: function (error, title) {
      return send(toReport("manual", error, title));
    }
  };
})();
"#;

pub(crate) fn renderer_bridge_script() -> String {
    RENDERER_BRIDGE_TEMPLATE
        .replace(CHANNEL_PLACEHOLDER, ERROR_HANDLER_CHANNEL)
        .replace(
            DEBOUNCE_PLACEHOLDER,
            &FAULT_DEBOUNCE_WINDOW.as_millis().to_string(),
        )
}

/// Background end of the error channel. Pages already debounce before
/// sending; the second window here coalesces faults across webviews.
pub(crate) struct ErrorBridgeState {
    debouncer: FaultDebouncer,
}

impl ErrorBridgeState {
    pub(crate) fn new(reporter: Arc<ErrorReporter>) -> Self {
        let forward = Arc::new(move |report: ErrorReport| {
            let title = report
                .title
                .clone()
                .unwrap_or_else(|| report.kind.default_title().to_string());
            reporter.handle_error(Some(&title), &report);
        });
        Self {
            debouncer: FaultDebouncer::new(FAULT_DEBOUNCE_WINDOW, forward),
        }
    }

    pub(crate) fn receive(&self, payload: Value) -> Result<(), String> {
        let report = ErrorReport::from_payload(payload).map_err(|error| {
            log::warn!(
                target: LOG_TARGET_ERROR_REPORTER,
                "rejected error report from webview: {error}"
            );
            error.to_string()
        })?;
        if report.kind != FaultKind::Manual {
            log::debug!(
                target: LOG_TARGET_ERROR_REPORTER,
                "queued {:?} from webview",
                report.kind
            );
        }
        self.debouncer.push(report);
        Ok(())
    }
}

#[tauri::command]
pub(crate) async fn report_error(
    state: State<'_, ErrorBridgeState>,
    report: Value,
) -> Result<(), String> {
    state.receive(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_reporter::{
        tests::RecordingPresenter, ErrorHandlerOverrides, ErrorPresenter,
    };
    use serde_json::json;
    use std::time::Duration;

    fn bridge_with_presenter() -> (ErrorBridgeState, Arc<RecordingPresenter>) {
        let presenter = Arc::new(RecordingPresenter::default());
        let reporter = Arc::new(ErrorReporter::new(
            "Shell",
            Arc::clone(&presenter) as Arc<dyn ErrorPresenter>,
        ));
        reporter.configure(ErrorHandlerOverrides {
            logger: Some(Arc::new(|_: &ErrorReport| Ok::<(), String>(()))),
            ..ErrorHandlerOverrides::default()
        });
        (ErrorBridgeState::new(reporter), presenter)
    }

    #[test]
    fn bridge_script_targets_the_error_channel() {
        let script = renderer_bridge_script();
        assert!(script.contains(&format!("\"{ERROR_HANDLER_CHANNEL}\"")));
        assert!(!script.contains(CHANNEL_PLACEHOLDER));
        assert!(script.contains("unhandledrejection"));
        assert!(script.contains("preventDefault"));
    }

    #[test]
    fn bridge_script_debounces_page_faults_before_sending() {
        let script = renderer_bridge_script();
        assert!(!script.contains(DEBOUNCE_PLACEHOLDER));
        assert!(script.contains("var debounceMs = 200;"));
        assert!(script.contains("sendDebounced(toReport(\"uncaughtError\""));
        assert!(script.contains("sendDebounced(toReport(\"unhandledRejection\""));
        assert!(script.contains("return send(toReport(\"manual\""));
    }

    #[tokio::test(start_paused = true)]
    async fn rapid_webview_faults_produce_one_dialog() {
        let (bridge, presenter) = bridge_with_presenter();

        for index in 0..3 {
            bridge
                .receive(json!({"kind": "uncaughtError", "message": format!("tick {index}")}))
                .unwrap();
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
        tokio::task::yield_now().await;

        let boxes = presenter.message_boxes.lock().unwrap();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].0, "Unhandled Error");
        assert_eq!(boxes[0].1, "tick 2");
    }

    #[tokio::test]
    async fn manual_report_keeps_its_title() {
        let (bridge, presenter) = bridge_with_presenter();

        bridge
            .receive(json!({"kind": "manual", "title": "Save failed", "message": "disk full"}))
            .unwrap();

        let boxes = presenter.message_boxes.lock().unwrap();
        assert_eq!(boxes[0].0, "Save failed");
    }

    #[tokio::test]
    async fn malformed_payload_is_rejected_to_the_caller() {
        let (bridge, presenter) = bridge_with_presenter();

        let error = bridge.receive(json!(["not", "a", "report"])).unwrap_err();

        assert!(error.contains("JSON object"));
        assert!(presenter.message_boxes.lock().unwrap().is_empty());
    }
}
