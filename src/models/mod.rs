pub mod alert;
pub mod enums;
pub mod worker;

pub use alert::{EmergencyAlert, Location, NewAlert};
pub use enums::{AlertStatus, ProfessionalType, WorkerRole};
pub use worker::HealthWorker;
