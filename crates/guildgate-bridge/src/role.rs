//! Role claim derivation from guild membership.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::provider::MembershipRecord;

/// Role embedded in the minted credential.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RoleClaim {
    /// No elevated privilege; serialises to `{}`.
    #[default]
    None,
    /// Serialises to `{"role":"admin"}`.
    Admin,
}

impl RoleClaim {
    pub fn is_admin(&self) -> bool {
        matches!(self, RoleClaim::Admin)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RoleClaim::None)
    }
}

impl Serialize for RoleClaim {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RoleClaim::None => serializer.serialize_map(Some(0))?.end(),
            RoleClaim::Admin => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("role", "admin")?;
                map.end()
            }
        }
    }
}

/// Admin iff the privileged role is among the member's roles.
pub fn derive_role(membership: &MembershipRecord, privileged_role_id: &str) -> RoleClaim {
    if membership.role_ids.contains(privileged_role_id) {
        RoleClaim::Admin
    } else {
        RoleClaim::None
    }
}
