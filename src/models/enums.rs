use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(AlertStatus {
    Pending => "pending",
    Assigning => "assigning",
    Assigned => "assigned",
    Completed => "completed",
    Cancelled => "cancelled",
});

str_enum!(ProfessionalType {
    Doctor => "doctor",
    Cho => "cho",
});

str_enum!(WorkerRole {
    Asha => "asha",
    Anm => "anm",
    Cho => "cho",
    Doctor => "doctor",
});

impl AlertStatus {
    /// Terminal states admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Whether the lifecycle defines an edge from `self` to `to`.
    ///
    /// Pending → Assigning is the re-broadcast transition kept for dispatch
    /// display. Cancelled is reachable from every non-terminal state but only
    /// by the owning patient (enforced one layer up).
    pub fn can_transition_to(&self, to: AlertStatus) -> bool {
        use AlertStatus::*;
        matches!(
            (self, to),
            (Pending, Assigning)
                | (Pending, Assigned)
                | (Assigning, Assigned)
                | (Assigned, Completed)
                | (Pending, Cancelled)
                | (Assigning, Cancelled)
                | (Assigned, Cancelled)
        )
    }
}
