//! Common validation utilities.

use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidationError;

/// Longest device identifier accepted from a client.
pub const MAX_DEVICE_ID_LEN: usize = 255;

/// Academic years a student may be enrolled in.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 6;

lazy_static! {
    static ref OTP_REGEX: Regex = Regex::new(r"^[0-9]{6}$").unwrap();
    static ref ENROLLMENT_REGEX: Regex = Regex::new(r"^[A-Za-z0-9/_-]{1,50}$").unwrap();
}

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if lat.is_finite() && (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if lon.is_finite() && (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates that a passcode is exactly six ASCII digits.
pub fn validate_otp(otp: &str) -> Result<(), ValidationError> {
    if OTP_REGEX.is_match(otp) {
        Ok(())
    } else {
        let mut err = ValidationError::new("otp_format");
        err.message = Some("OTP must be a 6-digit code".into());
        Err(err)
    }
}

/// Validates a client-supplied device identifier.
pub fn validate_device_id(device_id: &str) -> Result<(), ValidationError> {
    let trimmed = device_id.trim();
    if trimmed.is_empty() || device_id.len() > MAX_DEVICE_ID_LEN || trimmed != device_id {
        let mut err = ValidationError::new("device_id_format");
        err.message = Some("Device ID must be 1-255 characters without surrounding spaces".into());
        return Err(err);
    }
    Ok(())
}

/// Validates an enrollment number (letters, digits, `/`, `_`, `-`).
pub fn validate_enrollment_number(value: &str) -> Result<(), ValidationError> {
    if ENROLLMENT_REGEX.is_match(value) {
        Ok(())
    } else {
        let mut err = ValidationError::new("enrollment_number_format");
        err.message = Some("Enrollment number may only contain letters, digits, '/', '_' or '-'".into());
        Err(err)
    }
}

/// Validates the academic year.
pub fn validate_year(year: i32) -> Result<(), ValidationError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&year) {
        Ok(())
    } else {
        let mut err = ValidationError::new("year_range");
        err.message = Some("Year must be between 1 and 6".into());
        Err(err)
    }
}

/// Rejects values that are empty after trimming.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}
