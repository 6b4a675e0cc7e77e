//! Echo webhook receiver.
//!
//! A plain notification sink: it accepts any POSTed payload, logs it and
//! acknowledges receipt. It makes no admission decision and never touches the
//! validator or the channel backend.

use axum::body::Bytes;
use axum::{Json, Router, http::HeaderMap, http::StatusCode, response::IntoResponse, routing::post};
use serde_json::{Value, json};
use tracing::info;

/// Path of the echo receiver
pub const RECEIVER_PATH: &str = "/webhook";
/// Acknowledgement returned for every delivery
pub const RECEIVED_MESSAGE: &str = "Webhook received successfully";

/// Create the receiver router
pub fn create_receiver_router() -> Router {
    Router::new().route(RECEIVER_PATH, post(receive))
}

async fn receive(headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    info!(
        date = headers
            .get("date")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default(),
        headers = ?headers,
        "Webhook received"
    );
    info!(body = %String::from_utf8_lossy(&body), "Raw webhook body");

    if let Ok(payload) = serde_json::from_slice::<Value>(&body)
        && let Ok(pretty) = serde_json::to_string_pretty(&payload)
    {
        info!("Pretty payload:\n{}", pretty);
    }

    (StatusCode::OK, Json(json!({ "message": RECEIVED_MESSAGE })))
}

/// Run the receiver on `0.0.0.0:port` over plain HTTP.
pub async fn run_receiver_server(port: u16) -> Result<(), std::io::Error> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, path = RECEIVER_PATH, "Starting webhook receiver");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, create_receiver_router()).await?;

    Ok(())
}
