//! Authorization redirect capture.
//!
//! A single-slot mailbox hands the OAuth redirect result from the HTTP
//! layer to the flow awaiting it. The slot holds at most one undelivered
//! result and at most one waiter, and resets to empty after each full
//! cycle, so it can be reused for later authorizations. Running two waits
//! concurrently is unsupported: the most recently registered waiter wins
//! and the displaced one observes a closed channel.

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{info, warn};

/// Path the authorization provider redirects back to.
pub const CALLBACK_PATH: &str = "/oauth2callback";

/// Result of one authorization redirect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackResult {
    /// Authorization code; empty when the provider returned an error.
    pub code: String,
    /// Error string such as `access_denied`.
    pub error: Option<String>,
}

enum Slot {
    Empty,
    /// A redirect arrived before anyone was waiting; parked until consumed.
    CallbackPending(CallbackResult),
    /// A flow is blocked waiting for the next redirect.
    WaiterRegistered(oneshot::Sender<CallbackResult>),
}

/// Single-slot synchronization point between the callback route and the
/// authorization flow.
pub struct CallbackSlot {
    state: Mutex<Slot>,
}

impl CallbackSlot {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(Slot::Empty),
        }
    }

    /// Hands a redirect result to the registered waiter, or parks it in
    /// the slot until the next [`wait`](Self::wait).
    pub fn deliver(&self, result: CallbackResult) {
        let mut state = self.state.lock().unwrap();
        match std::mem::replace(&mut *state, Slot::Empty) {
            // Send failure means the waiter was dropped; the result is
            // discarded, like a redirect nobody asked for.
            Slot::WaiterRegistered(tx) => {
                let _ = tx.send(result);
            }
            _ => *state = Slot::CallbackPending(result),
        }
    }

    /// Waits for the next redirect result.
    ///
    /// Returns immediately when a result is already parked. There is no
    /// timeout here; callers wrap the wait in one when configured.
    pub async fn wait(&self) -> CallbackResult {
        let rx = {
            let mut state = self.state.lock().unwrap();
            match std::mem::replace(&mut *state, Slot::Empty) {
                Slot::CallbackPending(result) => return result,
                // Registering over an existing waiter closes its channel.
                Slot::Empty | Slot::WaiterRegistered(_) => {
                    let (tx, rx) = oneshot::channel();
                    *state = Slot::WaiterRegistered(tx);
                    rx
                }
            }
        };
        rx.await.unwrap_or_else(|_| CallbackResult {
            code: String::new(),
            error: Some("callback channel closed".to_string()),
        })
    }
}

impl Default for CallbackSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    error: Option<String>,
}

/// Confirmation page shown in the user's browser after the redirect.
/// Closes itself after two seconds; returned for success and error alike.
const CONFIRMATION_PAGE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <title>Authorization Complete</title>
    <style>
      body {
        font-family: Arial, sans-serif;
        display: flex;
        flex-direction: column;
        align-items: center;
        justify-content: center;
        height: 100vh;
        margin: 0;
        background-color: #f5f5f5;
      }
      .container {
        text-align: center;
        padding: 2rem;
        background-color: white;
        border-radius: 8px;
        box-shadow: 0 2px 4px rgba(0,0,0,0.1);
      }
      h1 { color: #2c3e50; }
      p { color: #34495e; }
    </style>
  </head>
  <body>
    <div class="container">
      <h1>Authorization Complete</h1>
      <p>You can close this window and return to the application.</p>
    </div>
    <script>
      setTimeout(() => window.close(), 2000);
    </script>
  </body>
</html>"#;

/// Builds the standalone callback router.
pub fn callback_router(slot: Arc<CallbackSlot>) -> Router {
    Router::new()
        .route(CALLBACK_PATH, get(handle_callback))
        .with_state(slot)
}

async fn handle_callback(
    State(slot): State<Arc<CallbackSlot>>,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let CallbackQuery { code, error } = query;

    // A request without either parameter is not an authorization
    // redirect; it falls through to the listener's 404.
    if code.is_none() && error.is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }

    if let Some(ref error) = error {
        warn!(error = %error, "authorization redirect carried an error");
    }

    slot.deliver(CallbackResult {
        code: code.unwrap_or_default(),
        error,
    });

    (
        [
            (header::CONTENT_TYPE, "text/html; charset=utf-8"),
            (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
        ],
        CONFIRMATION_PAGE,
    )
        .into_response()
}

/// Binds the callback listener on localhost and serves it until the
/// process exits.
pub async fn serve_callback(slot: Arc<CallbackSlot>, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    info!(port, "authorization callback listener ready");
    axum::serve(listener, callback_router(slot)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn result(code: &str, error: Option<&str>) -> CallbackResult {
        CallbackResult {
            code: code.to_string(),
            error: error.map(String::from),
        }
    }

    #[tokio::test]
    async fn deliver_then_wait_consumes_parked_result() {
        let slot = CallbackSlot::new();
        slot.deliver(result("abc123", None));
        assert_eq!(slot.wait().await, result("abc123", None));
    }

    #[tokio::test]
    async fn wait_then_deliver_resolves_the_waiter() {
        let slot = Arc::new(CallbackSlot::new());

        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.wait().await })
        };
        tokio::task::yield_now().await;
        slot.deliver(result("abc123", None));

        assert_eq!(waiter.await.unwrap(), result("abc123", None));
    }

    #[tokio::test]
    async fn slot_is_reusable_after_a_full_cycle() {
        let slot = CallbackSlot::new();

        slot.deliver(result("first", None));
        assert_eq!(slot.wait().await.code, "first");

        slot.deliver(result("second", None));
        assert_eq!(slot.wait().await.code, "second");
    }

    #[tokio::test]
    async fn displaced_waiter_observes_closed_channel() {
        let slot = Arc::new(CallbackSlot::new());

        let first = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.wait().await })
        };
        tokio::task::yield_now().await;

        // The second wait displaces the first waiter; only the second
        // receives the next callback.
        let second = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.wait().await })
        };
        tokio::task::yield_now().await;

        slot.deliver(result("abc123", None));

        let displaced = first.await.unwrap();
        assert!(displaced.error.is_some());
        assert_eq!(second.await.unwrap(), result("abc123", None));
    }

    #[tokio::test]
    async fn callback_with_code_responds_html_and_fills_slot() {
        let slot = Arc::new(CallbackSlot::new());
        let app = callback_router(slot.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/oauth2callback?code=abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/html; charset=utf-8"
        );
        assert_eq!(
            response.headers()[header::CACHE_CONTROL],
            "no-store, no-cache, must-revalidate"
        );

        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        assert!(String::from_utf8_lossy(&body).contains("Authorization Complete"));

        assert_eq!(slot.wait().await, result("abc123", None));
    }

    #[tokio::test]
    async fn callback_with_error_still_responds_ok() {
        let slot = Arc::new(CallbackSlot::new());
        let app = callback_router(slot.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/oauth2callback?error=access_denied")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(slot.wait().await, result("", Some("access_denied")));
    }

    #[tokio::test]
    async fn callback_without_parameters_is_not_found() {
        let slot = Arc::new(CallbackSlot::new());
        let app = callback_router(slot);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/oauth2callback")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let slot = Arc::new(CallbackSlot::new());
        let app = callback_router(slot);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/somewhere-else?code=abc123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
