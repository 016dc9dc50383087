use std::fmt;

use serde::Deserialize;

use crate::errors::AppError;

pub const DEFAULT_NEW_TIME: &str = "TBD";
pub const DEFAULT_REBOOKING_OPTIONS: &str = "Please see a gate agent for rebooking options";
pub const DEFAULT_COMPENSATION_DETAILS: &str = "Standard compensation per DOT regulations";
pub const DEFAULT_VOUCHER_POLICY: &str = "Meal vouchers available at gate for delays over 2 hours";
pub const DEFAULT_HOTEL_POLICY: &str = "Hotel accommodations provided for overnight cancellations";

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DisruptionKind {
    Delay,
    Cancellation,
    Diversion,
}

impl DisruptionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisruptionKind::Delay => "delay",
            DisruptionKind::Cancellation => "cancellation",
            DisruptionKind::Diversion => "diversion",
        }
    }
}

impl fmt::Display for DisruptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One flight disruption, as posted to `/api/generate-communications`.
///
/// Built once per request and never mutated. Optional policy fields fall back
/// to fixed wording when the caller omits them (or sends `null`).
#[derive(Debug, Clone, Deserialize)]
pub struct DisruptionRecord {
    pub flight_number: String,
    pub origin: String,
    pub destination: String,
    pub original_time: String,
    pub disruption_type: DisruptionKind,
    pub reason: String,
    #[serde(default = "default_new_time", deserialize_with = "or_default::new_time")]
    pub new_time: String,
    #[serde(
        default = "default_rebooking_options",
        deserialize_with = "or_default::rebooking_options"
    )]
    pub rebooking_options: String,
    #[serde(
        default = "default_compensation_details",
        deserialize_with = "or_default::compensation_details"
    )]
    pub compensation_details: String,
    #[serde(
        default = "default_voucher_policy",
        deserialize_with = "or_default::voucher_policy"
    )]
    pub voucher_policy: String,
    #[serde(
        default = "default_hotel_policy",
        deserialize_with = "or_default::hotel_policy"
    )]
    pub hotel_policy: String,
}

fn default_new_time() -> String {
    DEFAULT_NEW_TIME.to_string()
}

fn default_rebooking_options() -> String {
    DEFAULT_REBOOKING_OPTIONS.to_string()
}

fn default_compensation_details() -> String {
    DEFAULT_COMPENSATION_DETAILS.to_string()
}

fn default_voucher_policy() -> String {
    DEFAULT_VOUCHER_POLICY.to_string()
}

fn default_hotel_policy() -> String {
    DEFAULT_HOTEL_POLICY.to_string()
}

/// Explicit `null` gets the same fallback as an absent field.
mod or_default {
    use serde::{Deserialize, Deserializer};

    fn or<'de, D: Deserializer<'de>>(d: D, fallback: &str) -> Result<String, D::Error> {
        Ok(Option::<String>::deserialize(d)?.unwrap_or_else(|| fallback.to_string()))
    }

    pub fn new_time<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        or(d, super::DEFAULT_NEW_TIME)
    }

    pub fn rebooking_options<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        or(d, super::DEFAULT_REBOOKING_OPTIONS)
    }

    pub fn compensation_details<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        or(d, super::DEFAULT_COMPENSATION_DETAILS)
    }

    pub fn voucher_policy<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        or(d, super::DEFAULT_VOUCHER_POLICY)
    }

    pub fn hotel_policy<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        or(d, super::DEFAULT_HOTEL_POLICY)
    }
}

impl DisruptionRecord {
    /// Rejects required fields that are blank after trimming.
    pub fn validate(&self) -> Result<(), AppError> {
        let required = [
            ("flight_number", &self.flight_number),
            ("origin", &self.origin),
            ("destination", &self.destination),
            ("original_time", &self.original_time),
            ("reason", &self.reason),
        ];

        let blank: Vec<&str> = required
            .iter()
            .filter(|(_, value)| value.trim().is_empty())
            .map(|(name, _)| *name)
            .collect();

        if blank.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!(
                "{} cannot be empty",
                blank.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn minimal() -> serde_json::Value {
        json!({
            "flight_number": "AA123",
            "origin": "JFK",
            "destination": "LAX",
            "original_time": "10:00",
            "disruption_type": "delay",
            "reason": "Weather"
        })
    }

    #[test]
    fn test_missing_optional_fields_get_defaults() {
        let record: DisruptionRecord = serde_json::from_value(minimal()).unwrap();
        assert_eq!(record.new_time, "TBD");
        assert_eq!(record.rebooking_options, DEFAULT_REBOOKING_OPTIONS);
        assert_eq!(record.compensation_details, DEFAULT_COMPENSATION_DETAILS);
        assert_eq!(record.voucher_policy, DEFAULT_VOUCHER_POLICY);
        assert_eq!(record.hotel_policy, DEFAULT_HOTEL_POLICY);
    }

    #[test]
    fn test_null_optional_field_gets_default() {
        let mut body = minimal();
        body["hotel_policy"] = serde_json::Value::Null;
        body["new_time"] = json!("14:30");
        let record: DisruptionRecord = serde_json::from_value(body).unwrap();
        assert_eq!(record.hotel_policy, DEFAULT_HOTEL_POLICY);
        assert_eq!(record.new_time, "14:30");
    }

    #[test]
    fn test_disruption_kind_parses_lowercase_variants() {
        for (raw, kind) in [
            ("delay", DisruptionKind::Delay),
            ("cancellation", DisruptionKind::Cancellation),
            ("diversion", DisruptionKind::Diversion),
        ] {
            let mut body = minimal();
            body["disruption_type"] = json!(raw);
            let record: DisruptionRecord = serde_json::from_value(body).unwrap();
            assert_eq!(record.disruption_type, kind);
            assert_eq!(record.disruption_type.to_string(), raw);
        }
    }

    #[test]
    fn test_unknown_disruption_kind_is_rejected() {
        let mut body = minimal();
        body["disruption_type"] = json!("strike");
        let result: Result<DisruptionRecord, _> = serde_json::from_value(body);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let mut body = minimal();
        body.as_object_mut().unwrap().remove("reason");
        let result: Result<DisruptionRecord, _> = serde_json::from_value(body);
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_names_blank_fields() {
        let mut body = minimal();
        body["origin"] = json!("  ");
        body["reason"] = json!("");
        let record: DisruptionRecord = serde_json::from_value(body).unwrap();
        match record.validate() {
            Err(AppError::Validation(msg)) => {
                assert!(msg.contains("origin"));
                assert!(msg.contains("reason"));
                assert!(!msg.contains("flight_number"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_accepts_complete_record() {
        let record: DisruptionRecord = serde_json::from_value(minimal()).unwrap();
        assert!(record.validate().is_ok());
    }
}
