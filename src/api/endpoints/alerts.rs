//! Emergency alert endpoints — the portals' view of the lifecycle.

use std::str::FromStr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::dispatch::{self, RankedWorker};
use crate::emergency;
use crate::models::{AlertStatus, EmergencyAlert, Location, NewAlert, ProfessionalType};

#[derive(Deserialize)]
pub struct RaiseAlertRequest {
    pub patient_id: String,
    pub patient_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub symptoms: Option<String>,
}

#[derive(Serialize)]
pub struct AlertResponse {
    pub alert: EmergencyAlert,
}

/// `POST /api/alerts` — patient raises an emergency with their captured
/// device location.
pub async fn raise(
    State(ctx): State<ApiContext>,
    Json(req): Json<RaiseAlertRequest>,
) -> Result<(StatusCode, Json<AlertResponse>), ApiError> {
    let conn = ctx.conn()?;
    let alert = emergency::create_alert(
        &conn,
        NewAlert {
            patient_id: req.patient_id,
            patient_name: req.patient_name,
            location: Location {
                latitude: req.latitude,
                longitude: req.longitude,
            },
            symptoms: req.symptoms,
        },
    )?;
    Ok((StatusCode::CREATED, Json(AlertResponse { alert })))
}

/// `GET /api/alerts/:id` — the polling read.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlertResponse>, ApiError> {
    let conn = ctx.conn()?;
    let alert = emergency::alert_by_id(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("alert {id}")))?;
    Ok(Json(AlertResponse { alert }))
}

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: String,
}

#[derive(Serialize)]
pub struct AlertListResponse {
    pub alerts: Vec<EmergencyAlert>,
}

/// `GET /api/alerts?status=pending` — dispatch dashboard queues.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(query): Query<StatusQuery>,
) -> Result<Json<AlertListResponse>, ApiError> {
    let status = AlertStatus::from_str(&query.status)
        .map_err(|_| ApiError::BadRequest(format!("unknown status: {}", query.status)))?;

    let conn = ctx.conn()?;
    let alerts = emergency::alerts_by_status(&conn, status)?;
    Ok(Json(AlertListResponse { alerts }))
}

#[derive(Serialize)]
pub struct PatientAlertResponse {
    pub alert: Option<EmergencyAlert>,
}

/// `GET /api/alerts/patient/:patient_id` — most recent alert for a patient;
/// the portal uses this to gate the Emergency button.
pub async fn by_patient(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<String>,
) -> Result<Json<PatientAlertResponse>, ApiError> {
    let conn = ctx.conn()?;
    let alert = emergency::alert_for_patient(&conn, &patient_id)?;
    Ok(Json(PatientAlertResponse { alert }))
}

/// `POST /api/alerts/:id/assigning` — re-broadcast to the worker pool.
pub async fn assigning(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlertResponse>, ApiError> {
    let conn = ctx.conn()?;
    let alert = emergency::mark_assigning(&conn, &id)?;
    Ok(Json(AlertResponse { alert }))
}

#[derive(Deserialize)]
pub struct AcceptRequest {
    pub asha_id: String,
    pub asha_name: String,
}

/// `POST /api/alerts/:id/accept` — a health worker takes the alert. Exactly
/// one of two racing accepts wins; the other gets 409.
pub async fn accept(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<AcceptRequest>,
) -> Result<Json<AlertResponse>, ApiError> {
    let conn = ctx.conn()?;
    let alert = emergency::accept_alert(&conn, &id, &req.asha_id, &req.asha_name)?;
    Ok(Json(AlertResponse { alert }))
}

#[derive(Deserialize)]
pub struct NotifyProfessionalRequest {
    pub professional_id: String,
    pub professional_name: String,
    pub professional_type: String,
}

/// `POST /api/alerts/:id/professional` — record the notified doctor/CHO.
pub async fn professional(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<NotifyProfessionalRequest>,
) -> Result<Json<AlertResponse>, ApiError> {
    let prof_type = ProfessionalType::from_str(&req.professional_type).map_err(|_| {
        ApiError::BadRequest(format!("unknown professional type: {}", req.professional_type))
    })?;

    let conn = ctx.conn()?;
    let alert = emergency::notify_professional(
        &conn,
        &id,
        &req.professional_id,
        &req.professional_name,
        prof_type,
    )?;
    Ok(Json(AlertResponse { alert }))
}

/// `POST /api/alerts/:id/complete` — care concluded.
pub async fn complete(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
) -> Result<Json<AlertResponse>, ApiError> {
    let conn = ctx.conn()?;
    let alert = emergency::complete_alert(&conn, &id)?;
    Ok(Json(AlertResponse { alert }))
}

#[derive(Deserialize)]
pub struct CancelRequest {
    pub patient_id: String,
}

/// `POST /api/alerts/:id/cancel` — owner-only cancellation.
pub async fn cancel(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<Json<AlertResponse>, ApiError> {
    let conn = ctx.conn()?;
    let alert = emergency::cancel_alert(&conn, &id, &req.patient_id)?;
    Ok(Json(AlertResponse { alert }))
}

#[derive(Deserialize)]
pub struct NearestQuery {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct NearestWorkersResponse {
    pub workers: Vec<RankedWorker>,
}

/// `GET /api/alerts/:id/nearest-workers` — available workers ranked by
/// distance to the alert, for the dispatcher to ring down the list.
pub async fn nearest_workers(
    State(ctx): State<ApiContext>,
    Path(id): Path<Uuid>,
    Query(query): Query<NearestQuery>,
) -> Result<Json<NearestWorkersResponse>, ApiError> {
    let conn = ctx.conn()?;
    let alert = emergency::alert_by_id(&conn, &id)?
        .ok_or_else(|| ApiError::NotFound(format!("alert {id}")))?;

    let workers = dispatch::nearest_workers(&conn, alert.location, query.limit.unwrap_or(5))?;
    Ok(Json(NearestWorkersResponse { workers }))
}
