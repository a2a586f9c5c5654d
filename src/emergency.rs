//! Emergency alert lifecycle — creation rules, guarded status transitions,
//! owner-only cancellation.
//!
//! Every status change goes through `transition_alert`, which delegates to a
//! compare-and-swap UPDATE so two health workers racing to accept the same
//! alert cannot both win: exactly one sees the row in the expected prior
//! state. A failed transition leaves the alert unchanged.

use rusqlite::Connection;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{self, Assignment, DatabaseError};
use crate::location::{LocationError, LocationProvider};
use crate::models::{AlertStatus, EmergencyAlert, NewAlert, ProfessionalType};

#[derive(Error, Debug)]
pub enum EmergencyError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Alert not found: {0}")]
    NotFound(Uuid),

    #[error(transparent)]
    Location(#[from] LocationError),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ─── Creation ────────────────────────────────────────────────────────────────

/// Create a pending alert for a patient.
///
/// Requires a non-blank `patient_id` and a valid location. Rejects creation
/// while the patient already has a non-terminal alert open — one in-flight
/// emergency per patient.
pub fn create_alert(conn: &Connection, req: NewAlert) -> Result<EmergencyAlert, EmergencyError> {
    if req.patient_id.trim().is_empty() {
        return Err(EmergencyError::Validation("patient_id is required".into()));
    }
    if req.patient_name.trim().is_empty() {
        return Err(EmergencyError::Validation("patient_name is required".into()));
    }
    if !req.location.is_valid() {
        return Err(EmergencyError::Validation(format!(
            "location out of range: ({}, {})",
            req.location.latitude, req.location.longitude
        )));
    }

    if let Some(open) = db::active_alert_for_patient(conn, &req.patient_id)? {
        return Err(EmergencyError::Conflict(format!(
            "patient {} already has an open alert ({}, status {})",
            req.patient_id,
            open.id,
            open.status.as_str()
        )));
    }

    let alert = EmergencyAlert {
        id: Uuid::new_v4(),
        patient_id: req.patient_id,
        patient_name: req.patient_name,
        location: req.location,
        symptoms: req.symptoms.filter(|s| !s.trim().is_empty()),
        status: AlertStatus::Pending,
        assigned_asha_id: None,
        assigned_asha_name: None,
        assigned_professional_id: None,
        assigned_professional_name: None,
        assigned_professional_type: None,
        created_at: chrono::Utc::now().naive_utc(),
    };
    db::insert_alert(conn, &alert)?;

    tracing::info!(alert_id = %alert.id, patient_id = %alert.patient_id, "Emergency alert created");
    Ok(alert)
}

/// Capture the device location and create the alert in one step. This is the
/// patient-portal path: location capture is mandatory, and its failure is a
/// distinct, user-visible error.
pub fn raise_alert(
    conn: &Connection,
    provider: &dyn LocationProvider,
    patient_id: String,
    patient_name: String,
    symptoms: Option<String>,
) -> Result<EmergencyAlert, EmergencyError> {
    let location = provider.current_location()?;
    create_alert(
        conn,
        NewAlert {
            patient_id,
            patient_name,
            location,
            symptoms,
        },
    )
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Guarded status transition.
///
/// Fails with `Validation` when the lifecycle defines no edge
/// `from_expected → to`, `NotFound` when the row is gone, and `Conflict`
/// when the row's current status does not match `from_expected` (a
/// concurrent writer got there first).
pub fn transition_alert(
    conn: &Connection,
    id: &Uuid,
    from_expected: AlertStatus,
    to: AlertStatus,
    assignment: &Assignment,
) -> Result<EmergencyAlert, EmergencyError> {
    if !from_expected.can_transition_to(to) {
        return Err(EmergencyError::Validation(format!(
            "no transition {} -> {}",
            from_expected.as_str(),
            to.as_str()
        )));
    }

    let changed = db::transition_alert_row(conn, id, from_expected, to, assignment)?;
    if changed == 0 {
        return match db::get_alert(conn, id)? {
            None => Err(EmergencyError::NotFound(*id)),
            Some(current) => Err(EmergencyError::Conflict(format!(
                "alert {} is {} (expected {})",
                id,
                current.status.as_str(),
                from_expected.as_str()
            ))),
        };
    }

    tracing::info!(
        alert_id = %id,
        from = from_expected.as_str(),
        to = to.as_str(),
        "Alert transition applied"
    );

    db::get_alert(conn, id)?.ok_or(EmergencyError::NotFound(*id))
}

/// Re-broadcast transition: the worker pool has been notified but nobody has
/// accepted yet. Kept for dispatch display; carries no assignment.
pub fn mark_assigning(conn: &Connection, id: &Uuid) -> Result<EmergencyAlert, EmergencyError> {
    transition_alert(
        conn,
        id,
        AlertStatus::Pending,
        AlertStatus::Assigning,
        &Assignment::default(),
    )
}

/// A community health worker accepts the alert. The assignee fields land
/// atomically with the status change; a second accept on an already-assigned
/// alert fails with `Conflict` rather than overwriting the assignee.
pub fn accept_alert(
    conn: &Connection,
    id: &Uuid,
    asha_id: &str,
    asha_name: &str,
) -> Result<EmergencyAlert, EmergencyError> {
    if asha_id.trim().is_empty() || asha_name.trim().is_empty() {
        return Err(EmergencyError::Validation(
            "asha_id and asha_name are required to accept".into(),
        ));
    }

    let current = db::get_alert(conn, id)?.ok_or(EmergencyError::NotFound(*id))?;
    if !matches!(current.status, AlertStatus::Pending | AlertStatus::Assigning) {
        return Err(EmergencyError::Conflict(format!(
            "alert {} is {}, cannot accept",
            id,
            current.status.as_str()
        )));
    }

    let assignment = Assignment {
        asha_id: Some(asha_id.to_string()),
        asha_name: Some(asha_name.to_string()),
        ..Default::default()
    };
    // CAS from the observed status; a racing accept turns into Conflict here.
    transition_alert(conn, id, current.status, AlertStatus::Assigned, &assignment)
}

/// Record which doctor/CHO was notified for this alert. Status is unchanged;
/// the CAS guard still applies so the write is dropped if the alert moved
/// (or closed) underneath us.
pub fn notify_professional(
    conn: &Connection,
    id: &Uuid,
    professional_id: &str,
    professional_name: &str,
    professional_type: ProfessionalType,
) -> Result<EmergencyAlert, EmergencyError> {
    if professional_id.trim().is_empty() || professional_name.trim().is_empty() {
        return Err(EmergencyError::Validation(
            "professional id and name are required".into(),
        ));
    }

    let current = db::get_alert(conn, id)?.ok_or(EmergencyError::NotFound(*id))?;
    if current.status.is_terminal() {
        return Err(EmergencyError::Conflict(format!(
            "alert {} is {}, cannot record professional",
            id,
            current.status.as_str()
        )));
    }

    let assignment = Assignment {
        professional_id: Some(professional_id.to_string()),
        professional_name: Some(professional_name.to_string()),
        professional_type: Some(professional_type),
        ..Default::default()
    };
    let changed = db::transition_alert_row(conn, id, current.status, current.status, &assignment)?;
    if changed == 0 {
        return match db::get_alert(conn, id)? {
            None => Err(EmergencyError::NotFound(*id)),
            Some(now) => Err(EmergencyError::Conflict(format!(
                "alert {} moved to {} while recording professional",
                id,
                now.status.as_str()
            ))),
        };
    }

    db::get_alert(conn, id)?.ok_or(EmergencyError::NotFound(*id))
}

/// Care concluded. Only an assigned alert can complete.
pub fn complete_alert(conn: &Connection, id: &Uuid) -> Result<EmergencyAlert, EmergencyError> {
    transition_alert(
        conn,
        id,
        AlertStatus::Assigned,
        AlertStatus::Completed,
        &Assignment::default(),
    )
}

/// Cancel an alert. Only the owning patient may cancel, and only while the
/// alert is non-terminal. The row is retained with a terminal `cancelled`
/// status rather than deleted, so the history stays auditable.
pub fn cancel_alert(
    conn: &Connection,
    id: &Uuid,
    requesting_patient_id: &str,
) -> Result<EmergencyAlert, EmergencyError> {
    let current = db::get_alert(conn, id)?.ok_or(EmergencyError::NotFound(*id))?;

    if current.patient_id != requesting_patient_id {
        return Err(EmergencyError::Authorization(format!(
            "patient {requesting_patient_id} does not own alert {id}"
        )));
    }
    if current.status.is_terminal() {
        return Err(EmergencyError::Conflict(format!(
            "alert {} is already {}",
            id,
            current.status.as_str()
        )));
    }

    transition_alert(conn, id, current.status, AlertStatus::Cancelled, &Assignment::default())
}

// ─── Queries ─────────────────────────────────────────────────────────────────

pub fn alert_by_id(conn: &Connection, id: &Uuid) -> Result<Option<EmergencyAlert>, EmergencyError> {
    Ok(db::get_alert(conn, id)?)
}

/// Most recent alert for a patient. Drives the "Emergency" button state on
/// the patient portal.
pub fn alert_for_patient(
    conn: &Connection,
    patient_id: &str,
) -> Result<Option<EmergencyAlert>, EmergencyError> {
    Ok(db::latest_alert_for_patient(conn, patient_id)?)
}

pub fn alerts_by_status(
    conn: &Connection,
    status: AlertStatus,
) -> Result<Vec<EmergencyAlert>, EmergencyError> {
    Ok(db::list_alerts_by_status(conn, status)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_memory_database;
    use crate::location::testing::FixedProvider;
    use crate::models::Location;

    fn new_alert_req(patient_id: &str) -> NewAlert {
        NewAlert {
            patient_id: patient_id.to_string(),
            patient_name: "Lakshmi".to_string(),
            location: Location { latitude: 12.9, longitude: 77.6 },
            symptoms: None,
        }
    }

    #[test]
    fn create_yields_pending_with_exact_fields() {
        let conn = open_memory_database().unwrap();
        let mut req = new_alert_req("P1");
        req.symptoms = Some("breathing difficulty".to_string());

        let alert = create_alert(&conn, req).unwrap();
        assert_eq!(alert.status, AlertStatus::Pending);
        assert_eq!(alert.patient_id, "P1");
        assert_eq!(alert.location, Location { latitude: 12.9, longitude: 77.6 });
        assert_eq!(alert.symptoms.as_deref(), Some("breathing difficulty"));
    }

    #[test]
    fn create_without_symptoms_stores_null() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();
        assert!(alert.symptoms.is_none());

        let fetched = alert_by_id(&conn, &alert.id).unwrap().unwrap();
        assert!(fetched.symptoms.is_none());
    }

    #[test]
    fn create_requires_patient_id() {
        let conn = open_memory_database().unwrap();
        let mut req = new_alert_req("  ");
        req.patient_id = "  ".to_string();
        let err = create_alert(&conn, req).unwrap_err();
        assert!(matches!(err, EmergencyError::Validation(_)));
    }

    #[test]
    fn create_rejects_invalid_location() {
        let conn = open_memory_database().unwrap();
        let mut req = new_alert_req("P1");
        req.location = Location { latitude: 120.0, longitude: 77.6 };
        let err = create_alert(&conn, req).unwrap_err();
        assert!(matches!(err, EmergencyError::Validation(_)));
    }

    #[test]
    fn second_open_alert_conflicts() {
        let conn = open_memory_database().unwrap();
        create_alert(&conn, new_alert_req("P1")).unwrap();
        let err = create_alert(&conn, new_alert_req("P1")).unwrap_err();
        assert!(matches!(err, EmergencyError::Conflict(_)));
    }

    #[test]
    fn new_alert_allowed_after_previous_closed() {
        let conn = open_memory_database().unwrap();
        let first = create_alert(&conn, new_alert_req("P1")).unwrap();
        cancel_alert(&conn, &first.id, "P1").unwrap();
        // Terminal now, so a fresh alert is allowed
        create_alert(&conn, new_alert_req("P1")).unwrap();
    }

    #[test]
    fn raise_alert_captures_device_location() {
        let conn = open_memory_database().unwrap();
        let provider = FixedProvider(Ok(Location { latitude: 28.6, longitude: 77.2 }));
        let alert = raise_alert(&conn, &provider, "P1".into(), "Lakshmi".into(), None).unwrap();
        assert_eq!(alert.location.latitude, 28.6);
    }

    #[test]
    fn raise_alert_surfaces_permission_denied() {
        let conn = open_memory_database().unwrap();
        let provider = FixedProvider(Err("denied"));
        let err =
            raise_alert(&conn, &provider, "P1".into(), "Lakshmi".into(), None).unwrap_err();
        assert!(matches!(err, EmergencyError::Location(LocationError::PermissionDenied)));
        // No row was created
        assert!(alert_for_patient(&conn, "P1").unwrap().is_none());
    }

    #[test]
    fn raise_alert_surfaces_timeout() {
        let conn = open_memory_database().unwrap();
        let provider = FixedProvider(Err("timeout"));
        let err =
            raise_alert(&conn, &provider, "P1".into(), "Lakshmi".into(), None).unwrap_err();
        assert!(matches!(err, EmergencyError::Location(LocationError::Timeout { .. })));
    }

    #[test]
    fn accept_from_pending() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();

        let accepted = accept_alert(&conn, &alert.id, "A1", "Radha").unwrap();
        assert_eq!(accepted.status, AlertStatus::Assigned);
        assert_eq!(accepted.assigned_asha_id.as_deref(), Some("A1"));
        assert_eq!(accepted.assigned_asha_name.as_deref(), Some("Radha"));
    }

    #[test]
    fn accept_from_assigning() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();
        mark_assigning(&conn, &alert.id).unwrap();

        let accepted = accept_alert(&conn, &alert.id, "A1", "Radha").unwrap();
        assert_eq!(accepted.status, AlertStatus::Assigned);
    }

    #[test]
    fn double_accept_conflicts_and_keeps_first_assignee() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();

        accept_alert(&conn, &alert.id, "A1", "Radha").unwrap();
        let err = accept_alert(&conn, &alert.id, "A2", "Gita").unwrap_err();
        assert!(matches!(err, EmergencyError::Conflict(_)));

        let current = alert_by_id(&conn, &alert.id).unwrap().unwrap();
        assert_eq!(current.assigned_asha_id.as_deref(), Some("A1"));
    }

    #[test]
    fn concurrent_accepts_exactly_one_wins() {
        // Two connections to one on-disk database, racing on a fresh alert.
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("race.db");
        let conn_a = crate::db::open_database(&path).unwrap();
        let conn_b = crate::db::open_database(&path).unwrap();

        let alert = create_alert(&conn_a, new_alert_req("P1")).unwrap();

        let r1 = accept_alert(&conn_a, &alert.id, "A1", "Radha");
        let r2 = accept_alert(&conn_b, &alert.id, "A2", "Gita");

        let wins = [r1.is_ok(), r2.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(wins, 1, "exactly one accept must win");

        let current = alert_by_id(&conn_a, &alert.id).unwrap().unwrap();
        assert_eq!(current.status, AlertStatus::Assigned);
        // The loser did not overwrite the winner's assignment
        assert_eq!(current.assigned_asha_id.as_deref(), Some("A1"));
    }

    #[test]
    fn transition_with_undefined_edge_rejected() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();

        let err = transition_alert(
            &conn,
            &alert.id,
            AlertStatus::Pending,
            AlertStatus::Completed,
            &Assignment::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EmergencyError::Validation(_)));
    }

    #[test]
    fn transition_on_missing_alert_not_found() {
        let conn = open_memory_database().unwrap();
        let err = transition_alert(
            &conn,
            &Uuid::new_v4(),
            AlertStatus::Pending,
            AlertStatus::Assigning,
            &Assignment::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EmergencyError::NotFound(_)));
    }

    #[test]
    fn failed_transition_leaves_alert_unchanged() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();
        accept_alert(&conn, &alert.id, "A1", "Radha").unwrap();

        // Stale expectation: alert is Assigned, not Pending
        let err = transition_alert(
            &conn,
            &alert.id,
            AlertStatus::Pending,
            AlertStatus::Assigning,
            &Assignment::default(),
        )
        .unwrap_err();
        assert!(matches!(err, EmergencyError::Conflict(_)));

        let current = alert_by_id(&conn, &alert.id).unwrap().unwrap();
        assert_eq!(current.status, AlertStatus::Assigned);
    }

    #[test]
    fn complete_requires_assigned() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();

        assert!(complete_alert(&conn, &alert.id).is_err());

        accept_alert(&conn, &alert.id, "A1", "Radha").unwrap();
        let done = complete_alert(&conn, &alert.id).unwrap();
        assert_eq!(done.status, AlertStatus::Completed);
    }

    #[test]
    fn cancel_by_owner_succeeds_in_every_non_terminal_state() {
        let conn = open_memory_database().unwrap();

        for setup in ["pending", "assigning", "assigned"] {
            let alert = create_alert(&conn, new_alert_req("P1")).unwrap();
            match setup {
                "assigning" => {
                    mark_assigning(&conn, &alert.id).unwrap();
                }
                "assigned" => {
                    accept_alert(&conn, &alert.id, "A1", "Radha").unwrap();
                }
                _ => {}
            }
            let cancelled = cancel_alert(&conn, &alert.id, "P1").unwrap();
            assert_eq!(cancelled.status, AlertStatus::Cancelled);
        }
    }

    #[test]
    fn cancel_by_other_patient_forbidden() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();

        let err = cancel_alert(&conn, &alert.id, "P2").unwrap_err();
        assert!(matches!(err, EmergencyError::Authorization(_)));

        // Alert unchanged
        let current = alert_by_id(&conn, &alert.id).unwrap().unwrap();
        assert_eq!(current.status, AlertStatus::Pending);
    }

    #[test]
    fn cancel_retains_row() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();
        cancel_alert(&conn, &alert.id, "P1").unwrap();

        // Row is kept with terminal status, not deleted
        let current = alert_by_id(&conn, &alert.id).unwrap().unwrap();
        assert_eq!(current.status, AlertStatus::Cancelled);
    }

    #[test]
    fn cancel_twice_conflicts() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();
        cancel_alert(&conn, &alert.id, "P1").unwrap();
        let err = cancel_alert(&conn, &alert.id, "P1").unwrap_err();
        assert!(matches!(err, EmergencyError::Conflict(_)));
    }

    #[test]
    fn notify_professional_keeps_status() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();
        accept_alert(&conn, &alert.id, "A1", "Radha").unwrap();

        let updated =
            notify_professional(&conn, &alert.id, "D1", "Dr. Rao", ProfessionalType::Doctor)
                .unwrap();
        assert_eq!(updated.status, AlertStatus::Assigned);
        assert_eq!(updated.assigned_professional_id.as_deref(), Some("D1"));
        assert_eq!(updated.assigned_professional_type, Some(ProfessionalType::Doctor));
    }

    #[test]
    fn notify_professional_rejected_on_terminal() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();
        cancel_alert(&conn, &alert.id, "P1").unwrap();

        let err = notify_professional(&conn, &alert.id, "D1", "Dr. Rao", ProfessionalType::Cho)
            .unwrap_err();
        assert!(matches!(err, EmergencyError::Conflict(_)));
    }

    #[test]
    fn alert_for_patient_returns_just_created() {
        let conn = open_memory_database().unwrap();
        let alert = create_alert(&conn, new_alert_req("P1")).unwrap();
        let found = alert_for_patient(&conn, "P1").unwrap().unwrap();
        assert_eq!(found.id, alert.id);
    }

    #[test]
    fn dashboards_see_live_and_accepted_queues() {
        let conn = open_memory_database().unwrap();
        let a = create_alert(&conn, new_alert_req("P1")).unwrap();
        let b = create_alert(&conn, new_alert_req("P2")).unwrap();
        accept_alert(&conn, &b.id, "A1", "Radha").unwrap();

        let pending = alerts_by_status(&conn, AlertStatus::Pending).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, a.id);

        let assigned = alerts_by_status(&conn, AlertStatus::Assigned).unwrap();
        assert_eq!(assigned.len(), 1);
        assert_eq!(assigned[0].id, b.id);
    }
}
