/**
 * API REST HOSTDECK - Serveur HTTP consommé par le dashboard
 *
 * RÔLE :
 * Expose la télémétrie hôte et le contrôle des conteneurs en JSON.
 *
 * FONCTIONNEMENT :
 * - Chaque requête relit l'état réel (noyau ou runtime), aucun cache
 * - Seuls les compteurs de débit survivent entre requêtes (CounterStore)
 * - Lectures dégradées = champs à zéro/null, jamais d'erreur globale
 * - Mutations : 400 si entrée invalide, 500 si la commande échoue
 *
 * SÉCURITÉ :
 * - Action et identifiant validés avant toute commande
 * - Commandes lancées en argv, jamais via un shell
 */

use crate::error::ApiError;
use crate::health::ServerHealth;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use hostdeck_agent::{
    Container, ContainerAction, ContainerActionRequest, ContainerId, HostSnapshot, ProcessSample,
    RecreateOutcome, SpeedtestResult, Uptime, ValidationError,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

#[derive(Debug, Deserialize)]
struct IdBody {
    id: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Debug, Serialize)]
struct LogsResponse {
    logs: String,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/health", get(get_health))
        .route("/api/system", get(get_system))
        .route("/api/processes", get(get_processes))
        .route("/api/uptime", get(get_uptime))
        .route("/api/speedtest", get(get_speedtest))
        .route("/api/docker", get(list_containers))
        .route("/api/docker/logs", post(container_logs))
        .route("/api/docker/recreate", post(recreate_container))
        .route("/api/docker/{action}", post(container_action))
        .with_state(app_state)
}

/// Extrait `id` (brut, non validé) du corps JSON `{ "id": "..." }`
fn raw_id_from(body: &Bytes) -> Result<String, ApiError> {
    let parsed: IdBody = serde_json::from_slice(body)
        .map_err(|_| ApiError::BadRequest("Invalid request body".to_string()))?;
    match parsed.id {
        Some(serde_json::Value::String(id)) => Ok(id),
        _ => Err(ValidationError::MissingId.into()),
    }
}

fn container_id_from(body: &Bytes) -> Result<ContainerId, ApiError> {
    Ok(ContainerId::parse(&raw_id_from(body)?)?)
}

// GET /api/health (état du service)
async fn get_health(State(app): State<AppState>) -> Json<ServerHealth> {
    let proc_root = app.sampler.paths().proc_root.display().to_string();
    let health = app
        .health_tracker
        .get_health(app.containers.runtime_binary(), &proc_root, app.counters.len())
        .await;
    Json(health)
}

// GET /api/system (snapshot hôte)
async fn get_system(State(app): State<AppState>) -> Json<HostSnapshot> {
    Json(app.sampler.sample().await)
}

// GET /api/processes (top CPU)
async fn get_processes(State(app): State<AppState>) -> Result<Json<Vec<ProcessSample>>, ApiError> {
    let ranker = app.ranker.clone();
    tokio::task::spawn_blocking(move || ranker.rank())
        .await
        .map(Json)
        .map_err(|e| {
            error!("Process scan aborted: {e}");
            ApiError::Internal("Failed to get processes".to_string())
        })
}

// GET /api/uptime
async fn get_uptime(State(app): State<AppState>) -> Result<Json<Uptime>, ApiError> {
    app.sampler.uptime().map(Json).map_err(|e| {
        warn!("Uptime unavailable: {e}");
        ApiError::Internal("Failed to get uptime".to_string())
    })
}

// GET /api/speedtest
async fn get_speedtest(State(app): State<AppState>) -> Result<Json<SpeedtestResult>, ApiError> {
    app.speedtest.run().await.map(Json).map_err(|e| {
        warn!("Speedtest failed: {e}");
        ApiError::Internal("Speedtest failed or not installed".to_string())
    })
}

// GET /api/docker (liste)
async fn list_containers(State(app): State<AppState>) -> Json<Vec<Container>> {
    Json(app.containers.list().await)
}

// POST /api/docker/{action} (start | stop | restart)
async fn container_action(
    State(app): State<AppState>,
    Path(action): Path<String>,
    body: Bytes,
) -> Result<Json<SuccessResponse>, ApiError> {
    // action vérifiée avant même de lire le corps
    let action: ContainerAction = action.parse()?;
    if !action.is_lifecycle() {
        return Err(ValidationError::InvalidAction(action.as_str().to_string()).into());
    }

    let request = ContainerActionRequest::new(action, &raw_id_from(&body)?)?;
    app.containers.execute(&request).await?;
    Ok(Json(SuccessResponse { success: true }))
}

// POST /api/docker/logs
async fn container_logs(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<LogsResponse>, ApiError> {
    let id = container_id_from(&body)?;
    let logs = app
        .containers
        .logs(&id)
        .await
        .map_err(|e| ApiError::from_container(e, "Failed to fetch logs"))?;
    Ok(Json(LogsResponse { logs }))
}

// POST /api/docker/recreate
async fn recreate_container(
    State(app): State<AppState>,
    body: Bytes,
) -> Result<Json<RecreateOutcome>, ApiError> {
    let id = container_id_from(&body)?;
    let outcome = app
        .containers
        .recreate(&id)
        .await
        .map_err(|e| ApiError::from_container(e, "Recreate failed"))?;
    Ok(Json(outcome))
}
