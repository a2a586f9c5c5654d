use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::alert::Location;
use super::enums::WorkerRole;

/// A registered health worker (ASHA/ANM/CHO/doctor) eligible to accept
/// alerts. The phone number feeds the platform dialer on the client side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthWorker {
    pub id: Uuid,
    pub name: String,
    pub role: WorkerRole,
    pub phone: String,
    pub station: Location,
    pub available: bool,
}
