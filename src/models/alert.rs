use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AlertStatus, ProfessionalType};

/// A latitude/longitude pair captured from the patient's device at alert
/// creation. Immutable afterwards; no track history is kept.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// An emergency-assistance request raised by a patient.
///
/// Only `status` and the assignment fields mutate after creation; everything
/// else is fixed at insert time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub id: Uuid,
    pub patient_id: String,
    pub patient_name: String,
    pub location: Location,
    pub symptoms: Option<String>,
    pub status: AlertStatus,
    pub assigned_asha_id: Option<String>,
    pub assigned_asha_name: Option<String>,
    pub assigned_professional_id: Option<String>,
    pub assigned_professional_name: Option<String>,
    pub assigned_professional_type: Option<ProfessionalType>,
    pub created_at: NaiveDateTime,
}

/// Creation request for an alert. Validated by `emergency::create_alert`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAlert {
    pub patient_id: String,
    pub patient_name: String,
    pub location: Location,
    pub symptoms: Option<String>,
}
