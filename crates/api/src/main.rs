use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use fundwise_core::chat::{self, ChatReply, ConversationState};
use fundwise_core::domain::fund::Catalog;
use fundwise_core::domain::returns::ReturnSet;
use fundwise_core::ingest::amfi::{AmfiLiveClient, LiveNavSource};
use fundwise_core::ingest::history::HttpSchemeHistoryClient;
use fundwise_core::ingest::profiles;
use fundwise_core::recommend::{
    recommend, Recommendation, RecommendationRequest, RecommendOptions,
};
use fundwise_core::returns::{compute_returns, SchemeHistorySource};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = fundwise_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    // A missing or unreadable profile snapshot starts the API in degraded
    // mode: health stays green, fund endpoints answer 503 until a worker
    // run produces the snapshot.
    let catalog: Option<Arc<Catalog>> =
        match profiles::read_profiles(FsPath::new(&settings.fund_profiles_path)) {
            Ok(catalog) => {
                tracing::info!(funds = catalog.len(), "fund profile snapshot loaded");
                Some(Arc::new(catalog))
            }
            Err(e) => {
                sentry_anyhow::capture_anyhow(&e);
                tracing::error!(
                    error = %e,
                    path = %settings.fund_profiles_path,
                    "profile snapshot unavailable; starting API in degraded mode"
                );
                None
            }
        };

    let live: Arc<dyn LiveNavSource> = Arc::new(AmfiLiveClient::from_settings(&settings)?);
    let history: Arc<dyn SchemeHistorySource> =
        Arc::new(HttpSchemeHistoryClient::from_settings(&settings)?);

    let state = AppState {
        catalog,
        live,
        history,
        recommend_options: RecommendOptions::from_env(),
        sessions: Arc::new(Mutex::new(HashMap::new())),
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/recommend", post(post_recommend))
        .route("/chat", post(post_chat))
        .route("/returns/:scheme_code", get(get_returns))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    catalog: Option<Arc<Catalog>>,
    live: Arc<dyn LiveNavSource>,
    history: Arc<dyn SchemeHistorySource>,
    recommend_options: RecommendOptions,
    sessions: Arc<Mutex<HashMap<Uuid, ConversationState>>>,
}

async fn post_recommend(
    State(state): State<AppState>,
    Json(request): Json<RecommendationRequest>,
) -> Result<Json<Recommendation>, StatusCode> {
    let Some(catalog) = &state.catalog else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    if request.validate().is_err() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let recommendation = recommend(
        catalog,
        Arc::clone(&state.history),
        &request,
        &state.recommend_options,
    )
    .await
    .map_err(|e| {
        sentry_anyhow::capture_anyhow(&e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(recommendation))
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    session_id: Option<Uuid>,
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    session_id: Uuid,
    #[serde(flatten)]
    reply: ChatReply,
}

async fn post_chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, StatusCode> {
    let Some(catalog) = &state.catalog else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };

    let session_id = request.session_id.unwrap_or_else(Uuid::new_v4);

    // One conversation at a time per session: the map entry is taken out,
    // mutated by the turn, and written back.
    let mut conversation = {
        let mut sessions = state.sessions.lock().await;
        sessions.remove(&session_id).unwrap_or_default()
    };

    let reply = chat::respond(
        catalog,
        &mut conversation,
        state.live.as_ref(),
        state.history.as_ref(),
        &request.message,
    )
    .await;

    state
        .sessions
        .lock()
        .await
        .insert(session_id, conversation);

    Ok(Json(ChatResponse { session_id, reply }))
}

async fn get_returns(
    State(state): State<AppState>,
    Path(scheme_code): Path<String>,
) -> Result<Json<ReturnSet>, StatusCode> {
    let scheme_code = scheme_code.trim().to_string();
    if scheme_code.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let returns = compute_returns(state.history.as_ref(), &scheme_code).await;
    Ok(Json(returns))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &fundwise_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
