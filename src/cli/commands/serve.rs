//! HTTP API server.
//!
//! Exposes the RAG engine as `POST /chat`. Requests are stateless: each one
//! retrieves context for its message and calls the model once.

use crate::cli::Output;
use crate::config::Settings;
use crate::error::{BrosurError, FailureKind};
use crate::orchestrator::Orchestrator;
use crate::rag::{RagEngine, RagResponse};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

/// Shared application state.
struct AppState {
    engine: Arc<RagEngine>,
    include_scores: bool,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let include_scores = settings.server.include_scores;
    let cors_allow_any_origin = settings.server.cors_allow_any_origin;

    let orchestrator = Orchestrator::new(settings)?;

    // Index construction failures abort startup before binding.
    let spinner = Output::spinner("Indexing corpus...");
    let engine = orchestrator.build_engine(None).await;
    spinner.finish_and_clear();
    let engine = engine?;
    let chunk_count = engine.retriever().index().len();
    let mode = engine.assembler().mode();

    let state = Arc::new(AppState {
        engine: Arc::new(engine),
        include_scores,
    });
    let app = router(state, cors_allow_any_origin);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Brosur API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    Output::kv("Indexed chunks", &chunk_count.to_string());
    Output::kv("Context mode", &mode.to_string());
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Chat", "POST /chat");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    info!("Serving on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: Arc<AppState>, cors_allow_any_origin: bool) -> Router {
    let app = Router::new()
        .route("/health", get(health))
        .route("/chat", post(chat))
        .with_state(state);

    if cors_allow_any_origin {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app.layer(cors)
    } else {
        app
    }
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize)]
struct ChatResponse {
    reply: String,
    chunks: Vec<ChunkEntry>,
}

/// A retrieved chunk: `[text, score]`, or just the text when scores are hidden.
#[derive(Serialize)]
#[serde(untagged)]
enum ChunkEntry {
    Scored(String, f32),
    Text(String),
}

impl ChatResponse {
    fn from_rag(response: RagResponse, include_scores: bool) -> Self {
        let chunks = response
            .retrieved
            .chunks
            .into_iter()
            .map(|scored| {
                if include_scores {
                    ChunkEntry::Scored(scored.chunk.text, scored.score)
                } else {
                    ChunkEntry::Text(scored.chunk.text)
                }
            })
            .collect();

        Self {
            reply: response.reply,
            chunks,
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    kind: &'static str,
}

/// Status code for a failed request.
fn status_for(error: &BrosurError) -> StatusCode {
    match error {
        BrosurError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        BrosurError::EmbeddingService { kind, .. } | BrosurError::CompletionService { kind, .. } => {
            match kind {
                FailureKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
                FailureKind::Permanent | FailureKind::Malformed => StatusCode::BAD_GATEWAY,
            }
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_kind(error: &BrosurError) -> &'static str {
    match error {
        BrosurError::InvalidInput(_) => "invalid_input",
        BrosurError::EmbeddingService { .. } => "embedding_service",
        BrosurError::CompletionService { .. } => "completion_service",
        _ => "internal",
    }
}

fn error_response(error: BrosurError) -> Response {
    warn!("Request failed: {}", error);
    (
        status_for(&error),
        Json(ErrorResponse {
            kind: error_kind(&error),
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    match state.engine.answer(&req.message).await {
        Ok(response) => Json(ChatResponse::from_rag(response, state.include_scores)).into_response(),
        Err(e) => error_response(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::testing::{engine_with, ScriptedCompleter};

    async fn state_with(completer: ScriptedCompleter, include_scores: bool) -> Arc<AppState> {
        Arc::new(AppState {
            engine: Arc::new(engine_with(Arc::new(completer), 2).await),
            include_scores,
        })
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn request(message: &str) -> Json<ChatRequest> {
        Json(ChatRequest {
            message: message.to_string(),
        })
    }

    #[tokio::test]
    async fn test_chat_returns_reply_and_scored_chunks() {
        let state = state_with(ScriptedCompleter::new().reply("Hi there."), true).await;

        let response = chat(State(state), request("Hello")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["reply"], "Hi there.");
        let chunks = body["chunks"].as_array().unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0][0], "Hello world");
        assert_eq!(chunks[1][0], "Goodbye world");
        assert!(chunks[0][1].as_f64().unwrap() > 0.99);
    }

    #[tokio::test]
    async fn test_chat_without_scores_returns_texts() {
        let state = state_with(ScriptedCompleter::new().reply("Hi."), false).await;

        let body = body_json(chat(State(state), request("Hello")).await).await;
        assert_eq!(body["chunks"], serde_json::json!(["Hello world", "Goodbye world"]));
    }

    #[tokio::test]
    async fn test_chat_maps_failures_to_status_codes() {
        let state = state_with(ScriptedCompleter::new().fail(), true).await;
        let response = chat(State(state.clone()), request("Hello")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["kind"], "completion_service");

        let response = chat(State(state.clone()), request("unreachable")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body_json(response).await["kind"], "embedding_service");

        let response = chat(State(state), request("   ")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    /// Serve `app` on an ephemeral local port and return its base URL.
    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        format!("http://{}", addr)
    }

    fn client() -> reqwest::Client {
        reqwest::Client::builder().no_proxy().build().unwrap()
    }

    async fn preflight(base: &str) -> reqwest::Response {
        client()
            .request(reqwest::Method::OPTIONS, format!("{}/chat", base))
            .header("Origin", "https://shop.example")
            .header("Access-Control-Request-Method", "POST")
            .header("Access-Control-Request-Headers", "content-type")
            .send()
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let state = state_with(ScriptedCompleter::new(), true).await;
        let base = spawn_server(router(state, true)).await;

        let response = preflight(&base).await;
        assert!(response.status().is_success());
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn test_cors_disabled_sends_no_allow_origin() {
        let state = state_with(ScriptedCompleter::new(), true).await;
        let base = spawn_server(router(state, false)).await;

        let response = preflight(&base).await;
        assert!(response
            .headers()
            .get("access-control-allow-origin")
            .is_none());
    }

    #[tokio::test]
    async fn test_chat_through_router() {
        let state = state_with(ScriptedCompleter::new().reply("Routed."), true).await;
        let base = spawn_server(router(state, true)).await;

        let response = client()
            .post(format!("{}/chat", base))
            .header("Origin", "https://shop.example")
            .json(&serde_json::json!({ "message": "Hello" }))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["reply"], "Routed.");
    }

    #[test]
    fn test_permanent_failures_are_bad_gateway() {
        let err = BrosurError::completion(FailureKind::Permanent, "invalid api key");
        assert_eq!(status_for(&err), StatusCode::BAD_GATEWAY);
    }
}
