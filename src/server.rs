//! Local HTTP mirror of the submission and query operations.
//!
//! Routes and response shapes follow the wire format the advisor-side
//! consumers already speak: French field names (`domaine`, `Nom complet`)
//! and the `"Aucune réponse"` / `"0.0%"` defaults for students without a
//! submission. Every error response carries a machine-readable `error`
//! field.

use axum::{
    extract::{Json, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::store::{StudentRow, StudentStore};

struct ServerError(anyhow::Error);

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        error!("request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Internal server error" })),
        )
            .into_response()
    }
}

impl<E> From<E> for ServerError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn StudentStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/students", get(students))
        .route("/api/students/by_class/{class_name}", get(students_by_class))
        .route("/api/classes", get(classes))
        .route("/api/submit", post(submit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!("orientation mirror service listening on {bind_addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.probe().await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "healthy",
                "timestamp": Utc::now().to_rfc3339(),
            })),
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "status": "unhealthy",
                "error": e.to_string(),
            })),
        ),
    }
}

/// Formats a stored RFC 3339 timestamp the way the dashboards expect.
fn display_date(raw: Option<&str>) -> String {
    raw.and_then(|r| DateTime::parse_from_rfc3339(r).ok())
        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_default()
}

fn student_json(row: &StudentRow, with_code: bool) -> Value {
    let domaine = row
        .last_response
        .as_ref()
        .and_then(|r| r.get("domaine"))
        .and_then(Value::as_str)
        .unwrap_or("Aucune réponse")
        .to_string();
    let confidence = row
        .last_response
        .as_ref()
        .and_then(|r| r.get("confidence"))
        .and_then(Value::as_f64)
        .unwrap_or(0.0);

    let mut out = json!({
        "ID": row.student_id,
        "Nom complet": row.full_name,
        "Classe": row.class_name,
        "Domaine": domaine,
        "Confiance": format!("{confidence:.1}%"),
        "Date": display_date(row.submission_date.as_deref()),
    });
    if with_code {
        out["Code"] = json!(row.class_code.as_deref().unwrap_or("N/A"));
    }
    out
}

async fn students(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    let rows = state.store.students_with_last_response().await?;
    let body: Vec<Value> = rows.iter().map(|r| student_json(r, true)).collect();
    Ok(Json(json!(body)))
}

async fn students_by_class(
    State(state): State<AppState>,
    Path(class_name): Path<String>,
) -> Result<Response, ServerError> {
    let normalized = class_name.replace(['_', '-'], " ");
    if !normalized.chars().all(|c| c.is_alphanumeric() || c == ' ') || normalized.trim().is_empty() {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid class name format",
                "valid_format": "Alphanumeric with spaces, underscores or hyphens",
            })),
        )
            .into_response());
    }

    let rows = state.store.students_in_class(&normalized).await?;
    let body: Vec<Value> = rows.iter().map(|r| student_json(r, false)).collect();
    Ok(Json(json!(body)).into_response())
}

async fn classes(State(state): State<AppState>) -> Result<Json<Value>, ServerError> {
    let rows = state.store.classes_with_counts().await?;
    Ok(Json(json!(rows)))
}

async fn submit(State(state): State<AppState>, Json(data): Json<Value>) -> Response {
    let required = ["student_id", "domaine", "confidence"];
    let missing: Vec<&str> = required
        .iter()
        .filter(|f| data.get(**f).is_none())
        .copied()
        .collect();
    if !missing.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Missing required fields",
                "missing": missing,
            })),
        )
            .into_response();
    }

    // Serde accepts any number; the [0, 100] range check is ours.
    let confidence = data["confidence"].as_f64();
    let Some(confidence) = confidence.filter(|c| (0.0..=100.0).contains(c)) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "Invalid confidence value",
                "received": data["confidence"],
            })),
        )
            .into_response();
    };

    let student_id = data["student_id"].as_str().unwrap_or_default().to_string();
    let student = match state.store.get_student_info(&student_id).await {
        Ok(Some(student)) => student,
        Ok(None) => {
            warn!("submission for unknown student: {student_id}");
            return (
                StatusCode::NOT_FOUND,
                Json(json!({
                    "error": "Student not found",
                    "student_id": student_id,
                })),
            )
                .into_response();
        }
        Err(e) => return ServerError::from(e).into_response(),
    };

    let timestamp = Utc::now().to_rfc3339();
    let record = json!({
        "domaine": data["domaine"],
        "confidence": confidence,
        "submission_date": timestamp,
        "full_name": student.full_name,
        "class_name": student.class_name,
        "answers": data.get("answers").cloned().unwrap_or(Value::Null),
    });

    match state.store.save_response(&student_id, record).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "status": "success",
                "student_id": student_id,
                "domaine": data["domaine"],
                "confidence": confidence,
                "timestamp": timestamp,
            })),
        )
            .into_response(),
        Err(e) => {
            error!("failed to save submission for {student_id}: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to save response",
                    "student_id": student_id,
                })),
            )
                .into_response()
        }
    }
}
