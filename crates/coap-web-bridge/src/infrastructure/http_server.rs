//! HTTP server: routes, CORS, and the listener lifecycle.
//!
//! | Method  | Path          | Handler                              |
//! |---------|---------------|--------------------------------------|
//! | GET     | `/led`        | read LED state from the device       |
//! | POST    | `/led`        | set LED state (`{"state":"on"}`)     |
//! | GET     | `/health`     | static configuration summary         |
//! | GET     | `/test-esp32` | device reachability probe            |
//! | OPTIONS | any           | `204`, answered by the CORS layer    |
//!
//! When a public directory is configured, any other GET is served from it,
//! so the browser UI and the API share one origin.
//!
//! # Shutdown
//!
//! [`run_server`] stops accepting connections once its `shutdown` future
//! completes and returns after in-flight requests have drained.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    body::Bytes,
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::application::{BridgeError, BridgeService, DeviceTransport};
use crate::domain::messages::requested_state_from_body;
use crate::domain::{BridgeConfig, BridgeRequest, ConnectivityReport, HealthReport};

// ── Public API ────────────────────────────────────────────────────────────────

/// Builds the complete application router around `service`.
pub fn build_router(service: Arc<BridgeService>) -> Router {
    let mut router = Router::new()
        .route("/led", get(get_led).post(post_led))
        .route("/health", get(health))
        .route("/test-esp32", get(test_esp32));

    if let Some(dir) = &service.config().public_dir {
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(middleware::from_fn(cors))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Binds `config.http_bind_addr` and serves until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound (port in use, missing
/// permission) or the server fails while running.
pub async fn run_server<F>(
    config: BridgeConfig,
    transport: Arc<dyn DeviceTransport>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.http_bind_addr)
        .await
        .with_context(|| format!("failed to bind HTTP listener on {}", config.http_bind_addr))?;
    serve(listener, config, transport, shutdown).await
}

/// Serves on an already bound `listener`.
///
/// # Errors
///
/// Returns an error if the server fails while running.
pub async fn serve<F>(
    listener: TcpListener,
    config: BridgeConfig,
    transport: Arc<dyn DeviceTransport>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener
        .local_addr()
        .context("failed to read HTTP listener address")?;
    log_banner(local_addr, &config);

    let service = Arc::new(BridgeService::new(Arc::new(config), transport));
    axum::serve(listener, build_router(service))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server terminated with an error")?;

    info!("HTTP server stopped");
    Ok(())
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, self.to_string()).into_response()
    }
}

// ── Handlers ──────────────────────────────────────────────────────────────────

async fn get_led(State(service): State<Arc<BridgeService>>) -> Result<String, BridgeError> {
    service.handle(BridgeRequest::read_led()).await
}

async fn post_led(
    State(service): State<Arc<BridgeService>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<String, BridgeError> {
    if !is_json(&headers) {
        warn!("POST /led rejected: Content-Type is not application/json");
        return Err(BridgeError::InvalidInput);
    }
    let Some(state) = requested_state_from_body(&body) else {
        warn!(
            "POST /led rejected: body is not {{\"state\": <string>}} ({} bytes)",
            body.len()
        );
        return Err(BridgeError::InvalidInput);
    };
    service.handle(BridgeRequest::set_led(state)).await
}

/// `true` when the request declares a JSON body (`application/json`, with or
/// without parameters such as `charset`).
fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

async fn health(State(service): State<Arc<BridgeService>>) -> Json<HealthReport> {
    Json(service.health())
}

async fn test_esp32(State(service): State<Arc<BridgeService>>) -> Json<ConnectivityReport> {
    Json(service.probe().await)
}

// ── Middleware ────────────────────────────────────────────────────────────────

/// Answers every `OPTIONS` with `204` and stamps the CORS headers on every
/// response.
async fn cors(request: Request, next: Next) -> Response {
    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
    response
}

fn log_banner(local_addr: SocketAddr, config: &BridgeConfig) {
    info!("CoAP LED bridge listening on http://{local_addr}");
    info!("forwarding to {} (timeout {:?})", config.device, config.timeout);
    info!("  GET  /led         read LED state");
    info!("  POST /led         set LED state {{\"state\": \"on\"|\"off\"}}");
    info!("  GET  /health      bridge status");
    info!("  GET  /test-esp32  device connectivity test");
    match &config.public_dir {
        Some(dir) => info!("serving static files from {}", dir.display()),
        None => info!("no public directory configured; API only"),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;
    use tower::ServiceExt;

    use crate::application::transport::MockDeviceTransport;
    use crate::domain::DeviceEndpoint;

    fn router_without_device() -> Router {
        let mut mock = MockDeviceTransport::new();
        mock.expect_send().times(0);
        let service = BridgeService::new(Arc::new(BridgeConfig::default()), Arc::new(mock));
        build_router(Arc::new(service))
    }

    #[tokio::test]
    async fn test_bridge_error_renders_status_and_body() {
        // Act
        let response = BridgeError::DeviceTimeout.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        // Assert
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(&body[..], b"ESP32 timeout");
    }

    #[tokio::test]
    async fn test_options_on_unknown_path_is_no_content() {
        let request = axum::http::Request::builder()
            .method(Method::OPTIONS)
            .uri("/anything/at/all")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = router_without_device().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }

    #[tokio::test]
    async fn test_unknown_path_without_public_dir_is_not_found_with_cors() {
        let request = axum::http::Request::builder()
            .uri("/index.html")
            .body(axum::body::Body::empty())
            .unwrap();

        let response = router_without_device().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, OPTIONS"
        );
    }

    #[test]
    fn test_is_json_accepts_parameters_and_case() {
        let with = |value: &'static str| {
            let mut headers = HeaderMap::new();
            headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(value));
            headers
        };

        assert!(is_json(&with("application/json")));
        assert!(is_json(&with("application/json; charset=utf-8")));
        assert!(is_json(&with("Application/JSON")));
        assert!(!is_json(&with("text/plain")));
        assert!(!is_json(&with("application/x-www-form-urlencoded")));
        assert!(!is_json(&HeaderMap::new()));
    }

    #[tokio::test]
    async fn test_serve_answers_over_tcp_and_shuts_down() {
        // Arrange: real listener on an ephemeral port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let config = BridgeConfig {
            http_bind_addr: addr,
            device: DeviceEndpoint::new("10.9.8.7", 5683, "/led"),
            ..BridgeConfig::default()
        };
        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(serve(
            listener,
            config,
            Arc::new(MockDeviceTransport::new()),
            async move {
                let _ = stopped.await;
            },
        ));

        // Act: a raw HTTP/1.1 request
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: bridge\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();
        stop.send(()).unwrap();

        // Assert
        assert!(raw.starts_with("HTTP/1.1 200 OK"), "got: {raw}");
        assert!(raw.contains(r#""esp32_ip":"10.9.8.7""#));
        assert!(server.await.unwrap().is_ok());
    }
}
