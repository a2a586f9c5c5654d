//! Health worker roster endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::db;
use crate::models::{HealthWorker, Location, WorkerRole};

#[derive(Deserialize)]
pub struct RegisterWorkerRequest {
    pub name: String,
    pub role: String,
    pub phone: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize)]
pub struct WorkerResponse {
    pub worker: HealthWorker,
}

/// `POST /api/workers` — register a worker at their duty station.
pub async fn register(
    State(ctx): State<ApiContext>,
    Json(req): Json<RegisterWorkerRequest>,
) -> Result<(StatusCode, Json<WorkerResponse>), ApiError> {
    let role = WorkerRole::from_str(&req.role)
        .map_err(|_| ApiError::BadRequest(format!("unknown role: {}", req.role)))?;

    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("worker name is required".into()));
    }
    let station = Location {
        latitude: req.latitude,
        longitude: req.longitude,
    };
    if !station.is_valid() {
        return Err(ApiError::BadRequest("station coordinates out of range".into()));
    }

    let worker = HealthWorker {
        id: Uuid::new_v4(),
        name: req.name,
        role,
        phone: req.phone,
        station,
        available: true,
    };

    let conn = ctx.conn()?;
    db::insert_worker(&conn, &worker)?;
    Ok((StatusCode::CREATED, Json(WorkerResponse { worker })))
}

#[derive(Serialize)]
pub struct WorkerListResponse {
    pub workers: Vec<HealthWorker>,
}

/// `GET /api/workers` — currently available workers.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<WorkerListResponse>, ApiError> {
    let conn = ctx.conn()?;
    let workers = db::list_available_workers(&conn)?;
    Ok(Json(WorkerListResponse { workers }))
}
