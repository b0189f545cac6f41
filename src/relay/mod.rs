//! HTTP relay forwarder.
//!
//! Browsers refuse plain-HTTP calls from an HTTPS web view (mixed content),
//! so the embedded game talks to this relay instead. The relay is a single
//! stateless pass-through: it strips a routing prefix from the inbound
//! path, forwards method, body, and JSON content type to the fixed backend
//! origin, and mirrors the backend's status and body verbatim. One attempt
//! per request; no retry, no caching, no shared state beyond the HTTP
//! client, so concurrent requests never interfere.

use std::sync::Arc;

use anyhow::anyhow;
use log::{debug, info, warn};
use ntex::http::StatusCode;
use ntex::web::{self, HttpRequest, HttpResponse};
use ntex_cors::Cors;
use tokio::time::Duration;

use crate::config::RelayConfig;

struct RelayState {
    client: reqwest::Client,
    backend_origin: String,
    route_prefix: String,
    timeout: Duration,
}

/// Status and raw body as the backend returned them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardReply {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Rewrite an inbound path and query onto the backend origin. The routing
/// prefix is stripped when it matches a whole path segment; other paths are
/// forwarded unchanged.
pub fn rewrite_target(
    backend_origin: &str,
    route_prefix: &str,
    path: &str,
    query: &str,
) -> String {
    let rest = match path.strip_prefix(route_prefix) {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => path,
    };
    let mut target = format!("{}{}", backend_origin.trim_end_matches('/'), rest);
    if !query.is_empty() {
        target.push('?');
        target.push_str(query);
    }
    target
}

/// Perform the single upstream attempt. Failures bubble up for the handler
/// to translate into the fixed 500 error shape.
pub async fn forward(
    client: &reqwest::Client,
    method: &str,
    target: &str,
    body: Option<Vec<u8>>,
    deadline: Duration,
) -> anyhow::Result<ForwardReply> {
    let method = reqwest::Method::from_bytes(method.as_bytes())?;
    let mut request = client
        .request(method, target)
        .header(reqwest::header::CONTENT_TYPE, "application/json");
    if let Some(bytes) = body {
        if !bytes.is_empty() {
            request = request.body(bytes);
        }
    }
    let response = tokio::time::timeout(deadline, request.send())
        .await
        .map_err(|_| anyhow!("upstream timeout"))??;
    let status = response.status().as_u16();
    let body = response.bytes().await?.to_vec();
    Ok(ForwardReply { status, body })
}

/// Fixed error shape returned on any transport failure.
pub fn error_body(message: &str) -> serde_json::Value {
    serde_json::json!({ "error": "relay error", "message": message })
}

async fn relay_any(
    req: HttpRequest,
    body: ntex::util::Bytes,
    state: web::types::State<Arc<RelayState>>,
) -> HttpResponse {
    // Pre-flight permission checks get an empty success; the CORS
    // middleware has already attached the permissive headers.
    if req.method() == ntex::http::Method::OPTIONS {
        return HttpResponse::Ok().finish();
    }

    let target = rewrite_target(
        &state.backend_origin,
        &state.route_prefix,
        req.path(),
        req.query_string(),
    );
    debug!("relay {} {} -> {}", req.method(), req.path(), target);

    let payload = if body.is_empty() {
        None
    } else {
        Some(body.to_vec())
    };
    match forward(
        &state.client,
        req.method().as_str(),
        &target,
        payload,
        state.timeout,
    )
    .await
    {
        Ok(reply) => {
            let status =
                StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
            HttpResponse::build(status)
                .content_type("application/json")
                .body(ntex::util::Bytes::from(reply.body))
        }
        Err(e) => {
            warn!("relay forward to {} failed: {}", target, e);
            HttpResponse::InternalServerError().json(&error_body(&e.to_string()))
        }
    }
}

/// Run the relay server until the process is stopped.
pub async fn run(config: RelayConfig) -> anyhow::Result<()> {
    let state = Arc::new(RelayState {
        client: reqwest::Client::new(),
        backend_origin: config.backend_origin.clone(),
        route_prefix: config.route_prefix.clone(),
        timeout: Duration::from_secs(config.timeout_seconds),
    });

    info!(
        "relay listening on {}:{}, forwarding {}/* to {}",
        config.host, config.port, config.route_prefix, config.backend_origin
    );

    web::HttpServer::new(move || {
        web::App::new()
            .state(state.clone())
            .wrap(
                Cors::new()
                    .allowed_origin("*")
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec!["Content-Type"])
                    .max_age(3600)
                    .finish(),
            )
            .default_service(web::route().to(relay_any))
    })
    .bind(format!("{}:{}", config.host, config.port))?
    .run()
    .await?;

    Ok(())
}
