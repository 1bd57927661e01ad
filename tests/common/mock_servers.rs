//! Local HTTP servers standing in for external services.

use super::constants::DOCUMENT_PATH;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

async fn spawn_router(app: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().expect("Failed to get local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });
    format!("http://{}", addr)
}

#[derive(Default)]
struct GazetteState {
    document: Mutex<Option<Vec<u8>>>,
    landing_hits: AtomicUsize,
}

/// The gazette website: a landing page linking to today's edition.
pub struct MockGazette {
    pub base_url: String,
    state: Arc<GazetteState>,
}

async fn landing_page(State(state): State<Arc<GazetteState>>) -> impl IntoResponse {
    state.landing_hits.fetch_add(1, Ordering::SeqCst);
    Html(format!(
        r#"<html><body>
            <h1>Diário Oficial do Município</h1>
            <a href="/edicoes-anteriores">Edições anteriores</a>
            <a class="download" href="{}">Baixar edição de hoje</a>
        </body></html>"#,
        DOCUMENT_PATH
    ))
}

async fn document(State(state): State<Arc<GazetteState>>) -> impl IntoResponse {
    match state.document.lock().unwrap().clone() {
        Some(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/pdf")],
            bytes,
        )
            .into_response(),
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

impl MockGazette {
    /// Starts with no edition published; the document route answers 503.
    pub async fn spawn() -> Self {
        let state = Arc::new(GazetteState::default());
        let app = Router::new()
            .route("/", get(landing_page))
            .route(DOCUMENT_PATH, get(document))
            .with_state(state.clone());
        let base_url = spawn_router(app).await;
        Self { base_url, state }
    }

    pub fn publish(&self, text: &str) {
        *self.state.document.lock().unwrap() = Some(text.as_bytes().to_vec());
    }

    pub fn landing_url(&self) -> String {
        format!("{}/", self.base_url)
    }

    pub fn landing_hits(&self) -> usize {
        self.state.landing_hits.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
struct BrevoState {
    received: Mutex<Vec<(Option<String>, Value)>>,
    rejected_recipients: Mutex<HashSet<String>>,
}

/// The transactional email endpoint of Brevo.
pub struct MockBrevo {
    pub base_url: String,
    state: Arc<BrevoState>,
}

async fn send_email(
    State(state): State<Arc<BrevoState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let api_key = headers
        .get("api-key")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let recipient = body["to"][0]["email"].as_str().unwrap_or_default().to_string();

    let mut received = state.received.lock().unwrap();
    received.push((api_key, body));
    if state.rejected_recipients.lock().unwrap().contains(&recipient) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"code": "invalid_parameter", "message": "email is not valid"})),
        );
    }
    (
        StatusCode::CREATED,
        Json(json!({"messageId": format!("<{}@smtp-relay.mailin.fr>", received.len())})),
    )
}

impl MockBrevo {
    pub async fn spawn() -> Self {
        let state = Arc::new(BrevoState::default());
        let app = Router::new()
            .route("/v3/smtp/email", post(send_email))
            .with_state(state.clone());
        let base_url = spawn_router(app).await;
        Self { base_url, state }
    }

    pub fn api_url(&self) -> String {
        format!("{}/v3/smtp/email", self.base_url)
    }

    pub fn reject(&self, email: &str) {
        self.state
            .rejected_recipients
            .lock()
            .unwrap()
            .insert(email.to_string());
    }

    /// Request bodies received so far, in order.
    pub fn received(&self) -> Vec<Value> {
        self.state
            .received
            .lock()
            .unwrap()
            .iter()
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn api_keys(&self) -> Vec<Option<String>> {
        self.state
            .received
            .lock()
            .unwrap()
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}
