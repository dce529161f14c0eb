use std::fmt::{Display, Formatter};
use std::str::FromStr;

use medgate_core::AppError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_identifier {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            /// Creates a new random identifier.
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Creates an identifier from an existing UUID value.
            #[must_use]
            pub fn from_uuid(value: Uuid) -> Self {
                Self(value)
            }

            /// Returns the underlying UUID value.
            #[must_use]
            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl Display for $name {
            fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
                write!(formatter, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(value.trim())
                    .map(Self)
                    .map_err(|_| AppError::Validation(format!(concat!("invalid ", $label, " '{}'"), value)))
            }
        }
    };
}

uuid_identifier!(
    /// Identifier of a provisioned permission.
    PermissionId,
    "permission id"
);

uuid_identifier!(
    /// Identifier of an RBAC role.
    RoleId,
    "role id"
);

uuid_identifier!(
    /// Identifier of a temporary access code row.
    AccessCodeId,
    "access code id"
);

uuid_identifier!(
    /// Identifier of an access request.
    AccessRequestId,
    "access request id"
);

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AccessCodeId, RoleId};

    #[test]
    fn identifiers_parse_their_display_form() {
        let code_id = AccessCodeId::new();
        assert_eq!(
            AccessCodeId::from_str(code_id.to_string().as_str()).ok(),
            Some(code_id)
        );
    }

    #[test]
    fn invalid_identifier_names_its_kind() {
        let error = RoleId::from_str("nope").err().map(|error| error.to_string());
        assert_eq!(
            error.as_deref(),
            Some("validation error: invalid role id 'nope'")
        );
    }
}
