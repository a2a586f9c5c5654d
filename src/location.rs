//! Device location collaborator contract.
//!
//! The portals capture the patient's position at alert creation; an alert
//! without coordinates cannot be geo-routed, so acquisition failure must
//! surface as its own error path, distinct from network failure. Permission
//! denial and acquisition timeout are reported separately so the client can
//! show the right prompt.

use thiserror::Error;

use crate::models::Location;

#[derive(Error, Debug)]
pub enum LocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location acquisition timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

/// Source of the device's current position. Implemented by the platform
/// shim on each portal; implementations must request runtime permission
/// before reading and must bound acquisition with a timeout.
pub trait LocationProvider: Send + Sync {
    fn current_location(&self) -> Result<Location, LocationError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Provider returning a fixed position or a canned failure.
    pub struct FixedProvider(pub Result<Location, &'static str>);

    impl LocationProvider for FixedProvider {
        fn current_location(&self) -> Result<Location, LocationError> {
            match &self.0 {
                Ok(loc) => Ok(*loc),
                Err("denied") => Err(LocationError::PermissionDenied),
                Err("timeout") => Err(LocationError::Timeout { seconds: 10 }),
                Err(other) => Err(LocationError::Unavailable(other.to_string())),
            }
        }
    }
}
