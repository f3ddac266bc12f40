//! Input validation rules shared by the HTTP surface and the services.

use proxchat_core::error::AppError;
use proxchat_core::result::AppResult;

/// Username rule: 3–20 characters from `[A-Za-z0-9_ ]`.
pub fn validate_username(username: &str) -> AppResult<()> {
    if username.len() < 3 || username.len() > 20 {
        return Err(
            AppError::validation("username must be 3-20 characters").with_code("INVALID_USERNAME")
        );
    }

    let allowed = username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ' ');
    if !allowed {
        return Err(AppError::validation(
            "username may only contain letters, digits, underscores and spaces",
        )
        .with_code("INVALID_USERNAME"));
    }

    Ok(())
}

/// Latitude ∈ [−90, 90], longitude ∈ [−180, 180]. Boundary values are
/// accepted.
pub fn validate_coordinates(lat: f64, lon: f64) -> AppResult<()> {
    if !(-90.0..=90.0).contains(&lat) {
        return Err(AppError::validation("latitude must be between -90 and 90")
            .with_code("INVALID_COORDINATES"));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(
            AppError::validation("longitude must be between -180 and 180")
                .with_code("INVALID_COORDINATES"),
        );
    }
    Ok(())
}

/// Radius within the configured bounds, inclusive.
pub fn validate_radius(radius: u32, min: u32, max: u32) -> AppResult<()> {
    if radius < min || radius > max {
        return Err(AppError::validation(format!(
            "radius must be between {min} and {max} meters"
        ))
        .with_code("INVALID_RADIUS"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username("Alice").is_ok());
        assert!(validate_username("a b_c1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(21)).is_err());
        assert!(validate_username("bad!name").is_err());
        assert!(validate_username("émile").is_err());
    }

    #[test]
    fn username_error_carries_code() {
        let err = validate_username("!!").unwrap_err();
        assert_eq!(err.code(), "INVALID_USERNAME");
    }

    #[test]
    fn coordinate_bounds_inclusive() {
        assert!(validate_coordinates(90.0, 180.0).is_ok());
        assert!(validate_coordinates(-90.0, -180.0).is_ok());
        assert!(validate_coordinates(90.1, 0.0).is_err());
        assert!(validate_coordinates(0.0, -180.1).is_err());
    }

    #[test]
    fn radius_bounds_inclusive() {
        assert!(validate_radius(100, 100, 2000).is_ok());
        assert!(validate_radius(2000, 100, 2000).is_ok());
        assert!(validate_radius(99, 100, 2000).is_err());
        assert!(validate_radius(2001, 100, 2000).is_err());
    }
}
