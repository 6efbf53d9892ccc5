//! Health and metrics endpoint
//!
//! Fixed "up" health status plus Prometheus text exposition. Runs beside
//! the synchronizer and shares no mutable state with it; reconciliation
//! failures are visible in `/metrics`, not here.

use crate::error::ControlError;
use crate::metrics;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Respond to one request. `/metrics` serves the controller registry;
/// every other path answers with the health payload, so probes can hit
/// any path.
async fn handle<B>(req: Request<B>) -> Result<Response<Full<Bytes>>, hyper::http::Error> {
    match req.uri().path() {
        "/metrics" => match metrics::gather() {
            Ok(text) => Response::builder()
                .status(StatusCode::OK)
                .header(CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(text))),
            Err(e) => {
                warn!("Unable to gather metrics: {}", e);
                Response::builder()
                    .status(StatusCode::INTERNAL_SERVER_ERROR)
                    .body(Full::new(Bytes::new()))
            }
        },
        _ => Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .body(Full::new(Bytes::from(json!({"status": "up"}).to_string()))),
    }
}

/// Serve the health endpoint until the task is cancelled
pub async fn serve(addr: SocketAddr) -> Result<(), ControlError> {
    let listener = TcpListener::bind(addr).await?;
    info!("Health endpoint listening on {}", addr);

    loop {
        let (stream, peer) = listener.accept().await?;
        let io = TokioIo::new(stream);
        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new()
                .serve_connection(io, service_fn(handle))
                .await
            {
                debug!("Health connection error from {}: {}", peer, e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Empty};

    async fn body_of(response: Response<Full<Bytes>>) -> String {
        let collected = response
            .into_body()
            .collect()
            .await
            .expect("should collect body");
        String::from_utf8(collected.to_bytes().to_vec()).expect("body should be UTF-8")
    }

    #[tokio::test]
    async fn test_health_reports_up() {
        let req = Request::builder()
            .uri("/healthz")
            .body(Empty::<Bytes>::new())
            .expect("should build request");

        let response = handle(req).await.expect("should respond");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_of(response).await, r#"{"status":"up"}"#);
    }

    #[tokio::test]
    async fn test_health_answers_any_path() {
        let req = Request::builder()
            .uri("/")
            .body(Empty::<Bytes>::new())
            .expect("should build request");

        let response = handle(req).await.expect("should respond");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_of(response).await.contains("up"));
    }

    #[tokio::test]
    async fn test_metrics_exposition() {
        crate::metrics::record_service_event("added", "success");

        let req = Request::builder()
            .uri("/metrics")
            .body(Empty::<Bytes>::new())
            .expect("should build request");

        let response = handle(req).await.expect("should respond");

        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_of(response).await.contains("service_events_total"));
    }
}
