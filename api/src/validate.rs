use crate::errors::{Error, Result};
use crate::model::{CreateDeviceRequest, CreateTelemetryRequest, CreateUserRequest};
use chrono::{DateTime, Utc};

const DEVICE_NAME_MAX: usize = 255;
const DEVICE_TYPE_MAX: usize = 50;

/// Rejects text the relational backend cannot store
fn check_text(field: &str, value: &str, max_chars: Option<usize>) -> Result<()> {
    if value.contains('\0') {
        return Err(Error::Validation(format!(
            "{} must not contain NUL characters",
            field
        )));
    }

    if let Some(max) = max_chars {
        if value.chars().count() > max {
            return Err(Error::Validation(format!(
                "{} must be at most {} characters",
                field, max
            )));
        }
    }

    Ok(())
}

/// Validates a user creation request
pub fn validate_user(req: &CreateUserRequest) -> Result<()> {
    if req.username.is_empty() || req.email.is_empty() {
        return Err(Error::Validation(
            "Username and Email are required".to_string(),
        ));
    }

    check_text("Username", &req.username, None)?;
    check_text("Email", &req.email, None)?;

    Ok(())
}

/// Validates a device registration request
pub fn validate_device(req: &CreateDeviceRequest) -> Result<()> {
    if req.name.is_empty() || req.mac_address.is_empty() {
        return Err(Error::Validation(
            "Name and MacAddress are required".to_string(),
        ));
    }

    check_text("Name", &req.name, Some(DEVICE_NAME_MAX))?;
    check_text("Type", &req.device_type, Some(DEVICE_TYPE_MAX))?;
    check_text("MacAddress", &req.mac_address, None)?;

    Ok(())
}

/// Validates a telemetry request. A zero device id counts as missing.
pub fn validate_telemetry(req: &CreateTelemetryRequest) -> Result<()> {
    if req.device_id <= 0 || req.data_type.is_empty() {
        return Err(Error::Validation(
            "DeviceID and DataType are required".to_string(),
        ));
    }

    check_text("DataType", &req.data_type, None)?;

    if !req.value.is_finite() {
        return Err(Error::Validation(format!(
            "Value {} is not a finite number",
            req.value
        )));
    }

    Ok(())
}

/// Parses an RFC 3339 timestamp, falling back to the current time when the
/// value is absent or malformed.
pub fn parse_recorded_at(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Parses the `{id}` path segment of `/devices/{id}`
pub fn parse_device_id(raw: &str) -> Result<i64> {
    match raw.parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(Error::Validation("Invalid device ID".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn telemetry_request() -> CreateTelemetryRequest {
        CreateTelemetryRequest {
            device_id: 1,
            data_type: "Temperature".to_string(),
            value: 21.5,
            recorded_at: None,
        }
    }

    #[test]
    fn test_valid_user() {
        let req = CreateUserRequest {
            username: "testuser".to_string(),
            email: "test@example.com".to_string(),
        };

        assert!(validate_user(&req).is_ok());
    }

    #[test]
    fn test_user_missing_email() {
        let req = CreateUserRequest {
            username: "testuser".to_string(),
            email: "".to_string(),
        };

        assert!(matches!(validate_user(&req), Err(Error::Validation(_))));
    }

    #[test]
    fn test_device_missing_mac() {
        let req = CreateDeviceRequest {
            name: "thermo-1".to_string(),
            device_type: "Sensor".to_string(),
            mac_address: "".to_string(),
            is_active: None,
        };

        assert!(validate_device(&req).is_err());
    }

    #[test]
    fn test_device_type_is_optional() {
        let req = CreateDeviceRequest {
            name: "thermo-1".to_string(),
            device_type: "".to_string(),
            mac_address: "AA:BB:CC:DD:EE:01".to_string(),
            is_active: None,
        };

        assert!(validate_device(&req).is_ok());
    }

    #[test]
    fn test_user_with_nul_byte() {
        let req = CreateUserRequest {
            username: "test\0user".to_string(),
            email: "test@example.com".to_string(),
        };

        assert!(matches!(validate_user(&req), Err(Error::Validation(_))));
    }

    #[test]
    fn test_device_type_length_limit() {
        let mut req = CreateDeviceRequest {
            name: "thermo-1".to_string(),
            device_type: "S".repeat(50),
            mac_address: "AA:BB:CC:DD:EE:01".to_string(),
            is_active: None,
        };
        assert!(validate_device(&req).is_ok());

        req.device_type = "S".repeat(51);
        assert!(matches!(validate_device(&req), Err(Error::Validation(_))));
    }

    #[test]
    fn test_device_name_length_limit() {
        let mut req = CreateDeviceRequest {
            // multi-byte characters count once each
            name: "é".repeat(255),
            device_type: "Sensor".to_string(),
            mac_address: "AA:BB:CC:DD:EE:01".to_string(),
            is_active: None,
        };
        assert!(validate_device(&req).is_ok());

        req.name = "é".repeat(256);
        assert!(matches!(validate_device(&req), Err(Error::Validation(_))));
    }

    #[test]
    fn test_device_with_nul_byte() {
        let req = CreateDeviceRequest {
            name: "thermo\01".to_string(),
            device_type: "Sensor".to_string(),
            mac_address: "AA:BB:CC:DD:EE:01".to_string(),
            is_active: None,
        };

        assert!(matches!(validate_device(&req), Err(Error::Validation(_))));
    }

    #[test]
    fn test_telemetry_with_nul_byte() {
        let req = CreateTelemetryRequest {
            data_type: "Temp\0".to_string(),
            ..telemetry_request()
        };

        assert!(matches!(validate_telemetry(&req), Err(Error::Validation(_))));
    }

    #[test]
    fn test_valid_telemetry() {
        assert!(validate_telemetry(&telemetry_request()).is_ok());
    }

    #[test]
    fn test_telemetry_zero_device_id() {
        let req = CreateTelemetryRequest {
            device_id: 0,
            ..telemetry_request()
        };

        assert!(validate_telemetry(&req).is_err());
    }

    #[test]
    fn test_telemetry_empty_data_type() {
        let req = CreateTelemetryRequest {
            data_type: "".to_string(),
            ..telemetry_request()
        };

        assert!(validate_telemetry(&req).is_err());
    }

    #[test]
    fn test_recorded_at_parses_rfc3339() {
        let ts = parse_recorded_at(Some("2024-03-01T12:30:00+08:00"));
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 3, 1, 4, 30, 0).unwrap());
    }

    #[test]
    fn test_recorded_at_falls_back_to_now() {
        let before = Utc::now();
        let missing = parse_recorded_at(None);
        let garbage = parse_recorded_at(Some("yesterday at noon"));
        let after = Utc::now();

        assert!(missing >= before && missing <= after);
        assert!(garbage >= before && garbage <= after);
    }

    #[test]
    fn test_parse_device_id() {
        assert_eq!(parse_device_id("42").unwrap(), 42);
        assert!(parse_device_id("abc").is_err());
        assert!(parse_device_id("-3").is_err());
        assert!(parse_device_id("").is_err());
    }
}
