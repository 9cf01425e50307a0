/**
 * API REST CHATLET - Serveur HTTP principal
 *
 * RÔLE :
 * Expose l'état du moteur d'apps et le rapport de statistiques pour
 * les outils d'administration et la collecte de télémétrie.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum avec middleware auth API key
 * - Routes : /health, /statistics/apps, /apps (+ enable/disable)
 * - Sérialisation JSON automatique des réponses
 *
 * SÉCURITÉ :
 * - Header x-api-key obligatoire sur toutes routes sauf /health
 * - Validation côté middleware avant traitement métier
 */

use axum::extract::{Path, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::apps::{AppInfo, AppsEngine};
use crate::config::ServerConfig;
use crate::state::Shared;
use crate::statistics::{get_apps_statistics, AppsStatisticsSummary};

#[derive(Clone)]
pub struct AppState {
    pub engine: Shared<AppsEngine>,
    pub cfg: Shared<ServerConfig>,
}

async fn require_api_key(req: Request, next: Next) -> Result<Response, StatusCode> {
    let path = req.uri().path();

    // Health check toujours accessible
    if path.starts_with("/health") {
        return Ok(next.run(req).await);
    }

    let expected = std::env::var("CHATLET_API_KEY").unwrap_or_default();
    if expected.is_empty() {
        eprintln!("SECURITY: CHATLET_API_KEY not set - API access denied");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if !ok {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/statistics/apps", get(get_statistics))
        .route("/apps", get(list_apps))
        .route("/apps/{id}", get(get_app))
        .route("/apps/{id}/enable", post(enable_app))
        .route("/apps/{id}/disable", post(disable_app))
        .with_state(app_state)
        .layer(middleware::from_fn(require_api_key))
}

// GET /statistics/apps (rapport consommé par la télémétrie)
async fn get_statistics(State(app): State<AppState>) -> Json<AppsStatisticsSummary> {
    let engine_version = app.cfg.lock().marketplace_api_version.clone();
    let engine = app.engine.lock();
    Json(get_apps_statistics(&engine, &engine_version))
}

// GET /apps (liste)
async fn list_apps(State(app): State<AppState>) -> Result<Json<Vec<AppInfo>>, StatusCode> {
    let engine = app.engine.lock();
    let Some(manager) = engine.manager() else {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    };
    Ok(Json(manager.list_apps()))
}

// GET /apps/{id} (détail)
async fn get_app(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AppInfo>, StatusCode> {
    let engine = app.engine.lock();
    let manager = engine.manager().ok_or(StatusCode::SERVICE_UNAVAILABLE)?;
    manager
        .list_apps()
        .into_iter()
        .find(|info| info.id == id)
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

// POST /apps/{id}/enable (activation manuelle)
async fn enable_app(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut engine = app.engine.lock();
    let Some(manager) = engine.manager_mut() else {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "ok": false })));
    };
    match manager.enable_app(&id, true) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "ok": false, "msg": e.to_string() })),
        ),
    }
}

// POST /apps/{id}/disable (désactivation manuelle, hors statistiques d'échec)
async fn disable_app(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<serde_json::Value>) {
    let mut engine = app.engine.lock();
    let Some(manager) = engine.manager_mut() else {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(serde_json::json!({ "ok": false })));
    };
    match manager.disable_app(&id, true) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "ok": true }))),
        Err(e) => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "ok": false, "msg": e.to_string() })),
        ),
    }
}
