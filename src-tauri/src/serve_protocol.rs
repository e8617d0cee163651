use std::sync::Arc;

use tauri::{
    http::{header, Request, Response, StatusCode},
    utils::mime_type::MimeType,
    Builder, Runtime,
};

use crate::{static_serve::StaticServer, LOG_TARGET_STATIC_SERVE};

// 'self' covers the http://<scheme>.<host> origin WebView2 serves from.
pub(crate) fn content_security_policy(scheme: &str, dev: bool) -> String {
    if dev {
        format!(
            "default-src 'self' {scheme}://* 'unsafe-inline' devtools://* 'unsafe-eval' data:"
        )
    } else {
        format!("default-src 'self' {scheme}://* 'unsafe-inline' data:")
    }
}

fn partition_allows(partition: Option<&str>, webview_label: &str) -> bool {
    partition.is_none_or(|partition| partition == webview_label)
}

fn base_response(server: &StaticServer, status: StatusCode) -> tauri::http::response::Builder {
    let mut builder = Response::builder().status(status).header(
        header::CONTENT_SECURITY_POLICY,
        content_security_policy(server.scheme(), cfg!(debug_assertions)),
    );
    if server.scheme_privileges().cors_enabled {
        builder = builder.header(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*");
    }
    builder
}

fn empty_response(server: &StaticServer, status: StatusCode) -> Response<Vec<u8>> {
    base_response(server, status)
        .body(Vec::new())
        .unwrap_or_else(|_| Response::new(Vec::new()))
}

/// Serves one request. Resolution problems degrade to the index page; only a
/// missing index page turns into an empty 404.
pub(crate) async fn respond(server: &StaticServer, request_path: &str) -> Response<Vec<u8>> {
    let resolution = server.resolve(request_path).await;
    let path = resolution.path();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(error) => {
            log::warn!(
                target: LOG_TARGET_STATIC_SERVE,
                "failed to read {} for {request_path}: {error}",
                path.display()
            );
            return empty_response(server, StatusCode::NOT_FOUND);
        }
    };

    let mime_type = MimeType::parse(&bytes, &path.to_string_lossy());
    base_response(server, StatusCode::OK)
        .header(header::CONTENT_TYPE, mime_type)
        .body(bytes)
        .unwrap_or_else(|error| {
            log::warn!(
                target: LOG_TARGET_STATIC_SERVE,
                "failed to build response for {request_path}: {error}"
            );
            Response::new(Vec::new())
        })
}

/// Registers the custom scheme on the builder. Has to run before the app is
/// built; requests are answered on the async runtime.
pub(crate) fn register<R: Runtime>(builder: Builder<R>, server: Arc<StaticServer>) -> Builder<R> {
    let scheme = server.scheme().to_string();
    log::info!(
        target: LOG_TARGET_STATIC_SERVE,
        "registering scheme {scheme} for {} with {:?}",
        server.directory().display(),
        server.scheme_privileges()
    );

    builder.register_asynchronous_uri_scheme_protocol(
        scheme,
        move |ctx, request: Request<Vec<u8>>, responder| {
            let server = Arc::clone(&server);
            if !partition_allows(server.options().partition.as_deref(), ctx.webview_label()) {
                responder.respond(empty_response(&server, StatusCode::FORBIDDEN));
                return;
            }

            let request_path = request.uri().path().to_string();
            tauri::async_runtime::spawn(async move {
                let response = respond(&server, &request_path).await;
                responder.respond(response);
            });
        },
    )
}
