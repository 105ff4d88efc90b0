use std::time::Instant;

use axum::{
    body::{Body, to_bytes},
    extract::State,
    http::{
        Request, StatusCode,
        header::{CONTENT_LENGTH, CONTENT_TYPE},
        response::Parts,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::application::injection::{PageKind, classify, inject};

use super::AppState;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "innesto::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "innesto::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

/// Rewrite successful HTML responses for known static page templates,
/// splicing in published posts. Any failure along the way falls back to the
/// original body; a broken page list must never take down page serving. The
/// one exception is a failed body read: at that point the stream is already
/// consumed, there is no original left to serve, and the request answers 500.
pub async fn inject_dynamic_posts(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let kind = classify(request.uri().path());
    let response = next.run(request).await;

    if kind == PageKind::Passthrough || response.status() != StatusCode::OK {
        return response;
    }

    let is_html = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("text/html"));
    if !is_html {
        return response;
    }

    let posts = match state.posts.published().await {
        Ok(posts) => posts,
        Err(err) => {
            warn!(
                target = "innesto::http::inject",
                error = %err,
                "skipping injection, post listing failed",
            );
            return response;
        }
    };
    if posts.is_empty() {
        return response;
    }

    let (parts, body) = response.into_parts();
    let bytes = match to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            error!(
                target = "innesto::http::inject",
                error = %err,
                "failed to read response body for injection",
            );
            // The body was consumed by the failed read; no fallback exists.
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    match std::str::from_utf8(&bytes) {
        Ok(html) => {
            let injected = inject(&kind, html, &posts);
            rebuild_response(parts, Bytes::from(injected))
        }
        // Mislabeled binary content passes through untouched.
        Err(_) => rebuild_response(parts, bytes),
    }
}

fn rebuild_response(mut parts: Parts, bytes: Bytes) -> Response {
    parts.headers.remove(CONTENT_LENGTH);
    if let Ok(value) = bytes.len().to_string().parse() {
        parts.headers.insert(CONTENT_LENGTH, value);
    }
    Response::from_parts(parts, Body::from(bytes))
}
