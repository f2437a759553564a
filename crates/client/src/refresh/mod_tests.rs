// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use tokio::net::TcpListener;

use super::*;

/// Refresh endpoint that answers with a fixed status and body and records
/// every request body it receives.
async fn mock_refresh_server(
    status: u16,
    body: &str,
) -> (SocketAddr, Arc<AtomicU32>, Arc<Mutex<Vec<String>>>) {
    let call_count = Arc::new(AtomicU32::new(0));
    let received = Arc::new(Mutex::new(Vec::new()));
    let body = body.to_owned();

    let count = Arc::clone(&call_count);
    let seen = Arc::clone(&received);
    let app = Router::new().route(
        "/auth/refresh",
        post(move |request: String| {
            count.fetch_add(1, Ordering::Relaxed);
            seen.lock().push(request);
            let body = body.clone();
            async move {
                (
                    axum::http::StatusCode::from_u16(status)
                        .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR),
                    body,
                )
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (addr, call_count, received)
}

fn refresher(addr: SocketAddr) -> HttpTokenRefresher {
    let _ = rustls::crypto::ring::default_provider().install_default();
    HttpTokenRefresher::new(format!("http://{addr}/auth/refresh"), Duration::from_secs(5))
}

#[tokio::test]
async fn refresh_posts_token_and_parses_pair() -> anyhow::Result<()> {
    let body = serde_json::json!({ "accessToken": "access-2", "refreshToken": "refresh-2" });
    let (addr, calls, received) = mock_refresh_server(200, &body.to_string()).await;

    let pair = refresher(addr).refresh("refresh-1".to_owned()).await?;

    assert_eq!(pair, TokenPair::new("access-2", "refresh-2"));
    assert_eq!(calls.load(Ordering::Relaxed), 1);
    let sent: serde_json::Value = serde_json::from_str(&received.lock()[0])?;
    assert_eq!(sent, serde_json::json!({ "refreshToken": "refresh-1" }));
    Ok(())
}

#[tokio::test]
async fn missing_refresh_token_in_response_keeps_old_one() -> anyhow::Result<()> {
    let (addr, _, _) = mock_refresh_server(200, r#"{"accessToken": "access-2"}"#).await;

    let pair = refresher(addr).refresh("refresh-1".to_owned()).await?;

    assert_eq!(pair, TokenPair::new("access-2", "refresh-1"));
    Ok(())
}

#[tokio::test]
async fn non_success_status_is_rejection() {
    for (status, body) in [
        (401, r#"{"detail": "invalid refresh token"}"#),
        (403, "forbidden"),
        (500, "internal error"),
    ] {
        let (addr, calls, _) = mock_refresh_server(status, body).await;

        let result = refresher(addr).refresh("refresh-1".to_owned()).await;

        assert_eq!(result, Err(RefreshError::Rejected { status, body: body.to_owned() }));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }
}

#[tokio::test]
async fn unusable_body_is_malformed() {
    for body in ["<html>oops</html>", r#"{"token": "x"}"#, r#"{"accessToken": ""}"#] {
        let (addr, _, _) = mock_refresh_server(200, body).await;

        let result = refresher(addr).refresh("refresh-1".to_owned()).await;

        assert!(matches!(result, Err(RefreshError::Malformed(_))), "{body}: got {result:?}");
    }
}

#[tokio::test]
async fn closed_port_is_unreachable() -> anyhow::Result<()> {
    // Bind then drop to get a port nobody listens on.
    let addr = TcpListener::bind("127.0.0.1:0").await?.local_addr()?;

    let result = refresher(addr).refresh("refresh-1".to_owned()).await;

    assert!(matches!(result, Err(RefreshError::Unreachable(_))), "got {result:?}");
    Ok(())
}
