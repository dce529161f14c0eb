//! Temporary access codes: time-boxed grants of one permission to one user.

use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use medgate_core::{AppError, AppResult, UserId};
use serde::{Deserialize, Serialize};

use crate::{AccessCodeId, PermissionId, PermissionName};

/// Prefix of human-shareable codes issued by administrators.
pub const ACCESS_CODE_PREFIX: &str = "TAC";

/// Shape of a generated code string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessCodeFormat {
    /// `TAC-` followed by two groups of 16 uppercase hex characters.
    Prefixed,
    /// URL-safe unpadded base64 token.
    UrlSafe,
}

impl AccessCodeFormat {
    /// Returns the storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prefixed => "prefixed",
            Self::UrlSafe => "url_safe",
        }
    }
}

impl FromStr for AccessCodeFormat {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "prefixed" => Ok(Self::Prefixed),
            "url_safe" => Ok(Self::UrlSafe),
            _ => Err(AppError::Validation(format!(
                "unknown access code format '{value}'"
            ))),
        }
    }
}

/// What a new code grants, to whom and for how long.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessCodeTerms {
    /// User the code is bound to.
    pub user_id: UserId,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// Granted permission name.
    pub permission_name: PermissionName,
    /// Validity window in minutes.
    pub duration_minutes: u32,
    /// Whether the code may be activated only once.
    pub is_single_use: bool,
    /// Issuer, `None` for system-issued codes.
    pub issued_by: Option<UserId>,
}

/// Persisted temporary access code.
///
/// The plaintext code is never stored; rows carry its SHA-256 hash and a short
/// hint for administrative listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemporaryAccessCode {
    /// Stable row identifier.
    pub code_id: AccessCodeId,
    /// Hex SHA-256 of the plaintext code.
    pub code_hash: String,
    /// Non-secret hint such as `TAC-…9F2A`.
    pub code_hint: String,
    /// Granted permission.
    pub permission_id: PermissionId,
    /// Granted permission name.
    pub permission_name: PermissionName,
    /// User the code is bound to.
    pub user_id: UserId,
    /// Absolute expiry.
    pub expires_at: DateTime<Utc>,
    /// Whether the code may be activated only once.
    pub is_single_use: bool,
    /// Successful activations so far.
    pub times_used: u32,
    /// Cleared by revocation or by the activation of a single-use code.
    pub is_active: bool,
    /// Issuer, `None` for system-issued codes.
    pub created_by: Option<UserId>,
    /// Issue timestamp.
    pub created_at: DateTime<Utc>,
}

impl TemporaryAccessCode {
    /// Builds a fresh, active code from its terms.
    pub fn issue(
        code_id: AccessCodeId,
        code_hash: String,
        code_hint: String,
        terms: AccessCodeTerms,
        issued_at: DateTime<Utc>,
    ) -> AppResult<Self> {
        if terms.duration_minutes == 0 {
            return Err(AppError::Validation(
                "temporary access duration_minutes must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            code_id,
            code_hash,
            code_hint,
            permission_id: terms.permission_id,
            permission_name: terms.permission_name,
            user_id: terms.user_id,
            expires_at: issued_at + Duration::minutes(i64::from(terms.duration_minutes)),
            is_single_use: terms.is_single_use,
            times_used: 0,
            is_active: true,
            created_by: terms.issued_by,
            created_at: issued_at,
        })
    }

    /// Returns whether the code can still be activated by its owner.
    #[must_use]
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now < self.expires_at && !self.is_consumed()
    }

    /// Validates an activation attempt without mutating the code.
    ///
    /// Checks run in a fixed order: wall-clock expiry, single-use consumption,
    /// revocation, then ownership.
    pub fn check_activation(&self, requesting_user: UserId, now: DateTime<Utc>) -> AppResult<()> {
        if now >= self.expires_at {
            return Err(AppError::Expired(format!(
                "temporary access code '{}' expired at {}",
                self.code_hint,
                self.expires_at.to_rfc3339()
            )));
        }

        if self.is_consumed() {
            return Err(AppError::AlreadyUsed(format!(
                "temporary access code '{}' has already been used",
                self.code_hint
            )));
        }

        if !self.is_active {
            return Err(AppError::Expired(format!(
                "temporary access code '{}' has been revoked",
                self.code_hint
            )));
        }

        if self.user_id != requesting_user {
            return Err(AppError::NotOwner(format!(
                "temporary access code '{}' is not assigned to you",
                self.code_hint
            )));
        }

        Ok(())
    }

    /// Validates and records one activation.
    pub fn activate(&mut self, requesting_user: UserId, now: DateTime<Utc>) -> AppResult<()> {
        self.check_activation(requesting_user, now)?;

        self.times_used = self.times_used.saturating_add(1);
        if self.is_single_use {
            self.is_active = false;
        }

        Ok(())
    }

    /// Deactivates the code regardless of expiry or usage.
    pub fn revoke(&mut self) {
        self.is_active = false;
    }

    fn is_consumed(&self) -> bool {
        self.is_single_use && self.times_used > 0
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use medgate_core::{AppError, UserId};

    use super::{AccessCodeTerms, TemporaryAccessCode};
    use crate::{AccessCodeId, PermissionId, PermissionName};

    fn code(user_id: UserId, is_single_use: bool) -> TemporaryAccessCode {
        let issued_at = Utc
            .with_ymd_and_hms(2026, 3, 1, 8, 0, 0)
            .single()
            .unwrap_or_else(|| panic!("valid timestamp"));

        TemporaryAccessCode::issue(
            AccessCodeId::new(),
            "hash".to_owned(),
            "TAC-…0001".to_owned(),
            AccessCodeTerms {
                user_id,
                permission_id: PermissionId::new(),
                permission_name: PermissionName::new("view_sensitive_data")
                    .unwrap_or_else(|_| panic!("valid permission")),
                duration_minutes: 10,
                is_single_use,
                issued_by: None,
            },
            issued_at,
        )
        .unwrap_or_else(|_| panic!("valid code"))
    }

    #[test]
    fn issue_rejects_zero_duration() {
        let result = TemporaryAccessCode::issue(
            AccessCodeId::new(),
            "hash".to_owned(),
            "hint".to_owned(),
            AccessCodeTerms {
                user_id: UserId::new(),
                permission_id: PermissionId::new(),
                permission_name: PermissionName::new("edit_patient")
                    .unwrap_or_else(|_| panic!("valid permission")),
                duration_minutes: 0,
                is_single_use: true,
                issued_by: None,
            },
            Utc::now(),
        );

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[test]
    fn issue_sets_expiry_from_duration() {
        let code = code(UserId::new(), true);
        assert_eq!(code.expires_at - code.created_at, Duration::minutes(10));
        assert!(code.is_active);
        assert_eq!(code.times_used, 0);
    }

    #[test]
    fn single_use_code_activates_once() {
        let owner = UserId::new();
        let mut code = code(owner, true);
        let now = code.created_at + Duration::minutes(1);

        assert!(code.activate(owner, now).is_ok());
        assert_eq!(code.times_used, 1);
        assert!(!code.is_active);

        let second = code.activate(owner, now);
        assert!(matches!(second, Err(AppError::AlreadyUsed(_))));
        assert_eq!(code.times_used, 1);
        assert!(!code.is_active);
    }

    #[test]
    fn multi_use_code_activates_repeatedly() {
        let owner = UserId::new();
        let mut code = code(owner, false);
        let now = code.created_at + Duration::minutes(1);

        assert!(code.activate(owner, now).is_ok());
        assert!(code.activate(owner, now).is_ok());
        assert_eq!(code.times_used, 2);
        assert!(code.is_active);
    }

    #[test]
    fn expiry_wins_over_usage_state() {
        let owner = UserId::new();
        let mut code = code(owner, true);
        code.times_used = 1;
        code.is_active = false;

        let result = code.activate(owner, code.expires_at);
        assert!(matches!(result, Err(AppError::Expired(_))));
    }

    #[test]
    fn revoked_code_reports_expired() {
        let owner = UserId::new();
        let mut code = code(owner, false);
        code.revoke();

        let result = code.activate(owner, code.created_at);
        assert!(matches!(result, Err(AppError::Expired(_))));
        assert_eq!(code.times_used, 0);
    }

    #[test]
    fn foreign_user_cannot_activate_and_nothing_changes() {
        let mut code = code(UserId::new(), true);
        let before = code.clone();

        let result = code.activate(UserId::new(), code.created_at);
        assert!(matches!(result, Err(AppError::NotOwner(_))));
        assert_eq!(code, before);
    }

    #[test]
    fn usability_tracks_all_three_conditions() {
        let owner = UserId::new();
        let mut code = code(owner, true);
        let now = code.created_at;

        assert!(code.is_usable(now));
        assert!(!code.is_usable(code.expires_at));

        code.times_used = 1;
        assert!(!code.is_usable(now));
    }
}
