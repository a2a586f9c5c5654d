use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::enums::*;
use crate::models::*;

/// Assignment fields written alongside a status transition. `None` fields
/// leave the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct Assignment {
    pub asha_id: Option<String>,
    pub asha_name: Option<String>,
    pub professional_id: Option<String>,
    pub professional_name: Option<String>,
    pub professional_type: Option<ProfessionalType>,
}

// ═══════════════════════════════════════════
// Alert Repository
// ═══════════════════════════════════════════

const ALERT_COLUMNS: &str = "id, patient_id, patient_name, latitude, longitude, symptoms, status,
     assigned_asha_id, assigned_asha_name, assigned_professional_id,
     assigned_professional_name, assigned_professional_type, created_at";

pub fn insert_alert(conn: &Connection, alert: &EmergencyAlert) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO emergency_alerts (id, patient_id, patient_name, latitude, longitude, symptoms,
         status, assigned_asha_id, assigned_asha_name, assigned_professional_id,
         assigned_professional_name, assigned_professional_type, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
        params![
            alert.id.to_string(),
            alert.patient_id,
            alert.patient_name,
            alert.location.latitude,
            alert.location.longitude,
            alert.symptoms,
            alert.status.as_str(),
            alert.assigned_asha_id,
            alert.assigned_asha_name,
            alert.assigned_professional_id,
            alert.assigned_professional_name,
            alert.assigned_professional_type.map(|t| t.as_str()),
            alert.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_alert(conn: &Connection, id: &Uuid) -> Result<Option<EmergencyAlert>, DatabaseError> {
    query_one_alert(
        conn,
        &format!("SELECT {ALERT_COLUMNS} FROM emergency_alerts WHERE id = ?1"),
        params![id.to_string()],
    )
}

/// Most recent alert for a patient, regardless of status.
/// Ordered by creation timestamp, id as tiebreak for identical timestamps.
pub fn latest_alert_for_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<EmergencyAlert>, DatabaseError> {
    query_one_alert(
        conn,
        &format!(
            "SELECT {ALERT_COLUMNS} FROM emergency_alerts WHERE patient_id = ?1
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ),
        params![patient_id],
    )
}

/// Any non-terminal alert for a patient. Used to gate creation: a patient may
/// hold at most one in-flight emergency.
pub fn active_alert_for_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<EmergencyAlert>, DatabaseError> {
    query_one_alert(
        conn,
        &format!(
            "SELECT {ALERT_COLUMNS} FROM emergency_alerts
             WHERE patient_id = ?1 AND status NOT IN ('completed', 'cancelled')
             ORDER BY created_at DESC, id DESC LIMIT 1"
        ),
        params![patient_id],
    )
}

/// Alerts in a given status, most recent first. Feeds the dispatch dashboards
/// (live queue vs. accepted queue).
pub fn list_alerts_by_status(
    conn: &Connection,
    status: AlertStatus,
) -> Result<Vec<EmergencyAlert>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ALERT_COLUMNS} FROM emergency_alerts WHERE status = ?1
         ORDER BY created_at DESC, id DESC"
    ))?;

    let rows = stmt.query_map(params![status.as_str()], read_alert_row)?;
    let mut alerts = Vec::new();
    for row in rows {
        alerts.push(alert_from_row(row?)?);
    }
    Ok(alerts)
}

/// Compare-and-swap status transition.
///
/// The `WHERE id = ? AND status = ?` clause makes the read-check-write a
/// single atomic statement, so two workers racing on the same alert cannot
/// both observe the update as applied. Returns the number of rows changed
/// (0 means the expected prior status did not match, or the row is gone —
/// the caller distinguishes the two).
pub fn transition_alert_row(
    conn: &Connection,
    id: &Uuid,
    from_expected: AlertStatus,
    to: AlertStatus,
    assignment: &Assignment,
) -> Result<usize, DatabaseError> {
    let changed = conn.execute(
        "UPDATE emergency_alerts
         SET status = ?1,
             assigned_asha_id = COALESCE(?2, assigned_asha_id),
             assigned_asha_name = COALESCE(?3, assigned_asha_name),
             assigned_professional_id = COALESCE(?4, assigned_professional_id),
             assigned_professional_name = COALESCE(?5, assigned_professional_name),
             assigned_professional_type = COALESCE(?6, assigned_professional_type)
         WHERE id = ?7 AND status = ?8",
        params![
            to.as_str(),
            assignment.asha_id,
            assignment.asha_name,
            assignment.professional_id,
            assignment.professional_name,
            assignment.professional_type.map(|t| t.as_str()),
            id.to_string(),
            from_expected.as_str(),
        ],
    )?;
    Ok(changed)
}

fn query_one_alert(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Option<EmergencyAlert>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let result = stmt.query_row(params, read_alert_row);

    match result {
        Ok(row) => Ok(Some(alert_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// Internal row type for EmergencyAlert mapping
struct AlertRow {
    id: String,
    patient_id: String,
    patient_name: String,
    latitude: f64,
    longitude: f64,
    symptoms: Option<String>,
    status: String,
    assigned_asha_id: Option<String>,
    assigned_asha_name: Option<String>,
    assigned_professional_id: Option<String>,
    assigned_professional_name: Option<String>,
    assigned_professional_type: Option<String>,
    created_at: NaiveDateTime,
}

fn read_alert_row(row: &rusqlite::Row<'_>) -> Result<AlertRow, rusqlite::Error> {
    Ok(AlertRow {
        id: row.get(0)?,
        patient_id: row.get(1)?,
        patient_name: row.get(2)?,
        latitude: row.get(3)?,
        longitude: row.get(4)?,
        symptoms: row.get(5)?,
        status: row.get(6)?,
        assigned_asha_id: row.get(7)?,
        assigned_asha_name: row.get(8)?,
        assigned_professional_id: row.get(9)?,
        assigned_professional_name: row.get(10)?,
        assigned_professional_type: row.get(11)?,
        created_at: row.get(12)?,
    })
}

fn alert_from_row(row: AlertRow) -> Result<EmergencyAlert, DatabaseError> {
    Ok(EmergencyAlert {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        patient_id: row.patient_id,
        patient_name: row.patient_name,
        location: Location {
            latitude: row.latitude,
            longitude: row.longitude,
        },
        symptoms: row.symptoms,
        status: AlertStatus::from_str(&row.status)?,
        assigned_asha_id: row.assigned_asha_id,
        assigned_asha_name: row.assigned_asha_name,
        assigned_professional_id: row.assigned_professional_id,
        assigned_professional_name: row.assigned_professional_name,
        assigned_professional_type: row
            .assigned_professional_type
            .as_deref()
            .map(ProfessionalType::from_str)
            .transpose()?,
        created_at: row.created_at,
    })
}

// ═══════════════════════════════════════════
// Health Worker Repository
// ═══════════════════════════════════════════

pub fn insert_worker(conn: &Connection, worker: &HealthWorker) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO health_workers (id, name, role, phone, latitude, longitude, available)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            worker.id.to_string(),
            worker.name,
            worker.role.as_str(),
            worker.phone,
            worker.station.latitude,
            worker.station.longitude,
            worker.available as i32,
        ],
    )?;
    Ok(())
}

pub fn list_available_workers(conn: &Connection) -> Result<Vec<HealthWorker>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, role, phone, latitude, longitude, available
         FROM health_workers WHERE available = 1",
    )?;

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, String>(3)?,
            row.get::<_, f64>(4)?,
            row.get::<_, f64>(5)?,
            row.get::<_, i32>(6)?,
        ))
    })?;

    let mut workers = Vec::new();
    for row in rows {
        let (id, name, role, phone, latitude, longitude, available) = row?;
        workers.push(HealthWorker {
            id: Uuid::parse_str(&id)
                .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
            name,
            role: WorkerRole::from_str(&role)?,
            phone,
            station: Location { latitude, longitude },
            available: available != 0,
        });
    }
    Ok(workers)
}
