use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome reported by the license server for one key/email pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteValidation {
    pub valid: bool,
    pub lifetime: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl RemoteValidation {
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// The single validation record kept per installation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LicenseValidation {
    pub license_key: String,
    pub valid: bool,
    pub lifetime: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub validated_at: DateTime<Utc>,
}

impl LicenseValidation {
    pub fn from_remote(
        license_key: String,
        remote: RemoteValidation,
        validated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            license_key,
            valid: remote.valid,
            lifetime: remote.lifetime,
            expires_at: remote.expires_at,
            error: remote.error,
            validated_at,
        }
    }

    /// Valid and either lifetime or not yet past its expiry.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        if !self.valid {
            return false;
        }
        if self.lifetime {
            return true;
        }
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// What the installation knows about its license without a network call.
///
/// `NoLicense` means no key was ever stored ("never activated"), which the UI
/// shows differently from a `Checked` record whose `valid` is false.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LicenseStatus {
    #[serde(rename = "none")]
    NoLicense,
    #[serde(rename_all = "camelCase")]
    Unvalidated { license_key: String },
    Checked(LicenseValidation),
}

impl LicenseStatus {
    /// Only a checked record can be active; an expired one reads as inactive
    /// until the next validation.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        match self {
            LicenseStatus::Checked(validation) => validation.is_active(now),
            LicenseStatus::NoLicense | LicenseStatus::Unvalidated { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn validation(
        valid: bool,
        lifetime: bool,
        expires_at: Option<DateTime<Utc>>,
    ) -> LicenseValidation {
        LicenseValidation {
            license_key: "KEY".into(),
            valid,
            lifetime,
            expires_at,
            error: None,
            validated_at: Utc::now(),
        }
    }

    #[test]
    fn expiry_only_matters_for_non_lifetime_licenses() {
        let now = Utc::now();
        let past = Some(now - Duration::days(1));

        assert!(validation(true, true, past).is_active(now));
        assert!(!validation(true, false, past).is_active(now));
        assert!(validation(true, false, Some(now + Duration::days(1))).is_active(now));
        assert!(validation(true, false, None).is_active(now));
        assert!(!validation(false, true, None).is_active(now));
    }

    #[test]
    fn only_checked_records_can_be_active() {
        let now = Utc::now();
        let expired = Some(now - Duration::hours(1));

        assert!(!LicenseStatus::NoLicense.is_active(now));
        assert!(!LicenseStatus::Unvalidated {
            license_key: "K".into()
        }
        .is_active(now));
        assert!(LicenseStatus::Checked(validation(true, false, None)).is_active(now));
        assert!(!LicenseStatus::Checked(validation(true, false, expired)).is_active(now));
    }

    #[test]
    fn status_serializes_with_a_state_tag() {
        assert_eq!(
            serde_json::to_value(LicenseStatus::NoLicense).unwrap(),
            json!({"state": "none"})
        );
        assert_eq!(
            serde_json::to_value(LicenseStatus::Unvalidated {
                license_key: "K".into()
            })
            .unwrap(),
            json!({"state": "unvalidated", "licenseKey": "K"})
        );

        let checked = serde_json::to_value(LicenseStatus::Checked(validation(true, true, None)))
            .unwrap();
        assert_eq!(checked["state"], "checked");
        assert_eq!(checked["licenseKey"], "KEY");
    }

    #[test]
    fn remote_outcome_tolerates_missing_fields() {
        let remote: RemoteValidation =
            serde_json::from_value(json!({"valid": true})).unwrap();
        assert!(remote.valid);
        assert!(!remote.lifetime);
        assert_eq!(remote.error, None);
    }
}
