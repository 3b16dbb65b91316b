/// Degrees in a full turn.
pub const FULL_TURN: f64 = 360.0;

/// Wrap an angle into [0, 360).
///
/// Uses `((x % 360) + 360) % 360` rather than `rem_euclid`, which can return
/// exactly 360.0 for tiny negative inputs.
pub fn normalize_degrees(deg: f64) -> f64 {
    let wrapped = ((deg % FULL_TURN) + FULL_TURN) % FULL_TURN;
    if wrapped >= FULL_TURN {
        0.0
    } else {
        wrapped
    }
}

/// North offset to persist after the operator has turned the camera to
/// `heading` while the image was displayed with `stored_offset`.
///
/// The image is pre-rotated by the negative of the camera drift, on top of
/// whatever offset was already applied. Both inputs may be unnormalized.
pub fn north_offset_after_commit(stored_offset: f64, heading: f64) -> f64 {
    normalize_degrees(stored_offset - normalize_degrees(heading))
}

/// Rotation about the vertical axis, in radians, applied once to the
/// panorama sphere when it is loaded.
pub fn sphere_rotation_radians(north_offset: f64) -> f64 {
    normalize_degrees(north_offset).to_radians()
}

/// Check that a north offset is finite and already inside [0, 360).
pub fn validate_north_offset(deg: f64) -> Result<f64, String> {
    if !deg.is_finite() {
        return Err(format!("North offset must be a finite number, got {}", deg));
    }
    if !(0.0..FULL_TURN).contains(&deg) {
        return Err(format!("North offset must be in [0, 360), got {}", deg));
    }
    Ok(deg)
}

/// Whole-degree label for a heading, e.g. "125°".
pub fn format_heading(deg: f64) -> String {
    let rounded = deg.round();
    format!("{}°", normalize_degrees(rounded) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_in_range_is_identity() {
        assert!((normalize_degrees(0.0) - 0.0).abs() < 1e-9);
        assert!((normalize_degrees(123.5) - 123.5).abs() < 1e-9);
        assert!((normalize_degrees(359.9) - 359.9).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_wraps_full_turns() {
        assert!((normalize_degrees(360.0) - 0.0).abs() < 1e-9);
        assert!((normalize_degrees(370.0) - 10.0).abs() < 1e-9);
        assert!((normalize_degrees(1085.0) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_negative() {
        assert!((normalize_degrees(-85.0) - 275.0).abs() < 1e-9);
        assert!((normalize_degrees(-360.0) - 0.0).abs() < 1e-9);
        assert!((normalize_degrees(-725.0) - 355.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_tiny_negative_stays_below_full_turn() {
        let n = normalize_degrees(-1e-15);
        assert!((0.0..FULL_TURN).contains(&n));
    }

    #[test]
    fn test_commit_offset_example() {
        assert!((north_offset_after_commit(40.0, 125.0) - 275.0).abs() < 1e-9);
    }

    #[test]
    fn test_commit_offset_noop() {
        assert_eq!(north_offset_after_commit(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_commit_offset_unnormalized_heading() {
        assert!((north_offset_after_commit(10.0, 370.0) - 0.0).abs() < 1e-9);
    }

    #[test]
    fn test_commit_offset_accumulates() {
        // Two successive calibrations compose.
        let first = north_offset_after_commit(0.0, 30.0);
        let second = north_offset_after_commit(first, 15.0);
        assert!((first - 330.0).abs() < 1e-9);
        assert!((second - 315.0).abs() < 1e-9);
    }

    #[test]
    fn test_sphere_rotation_radians() {
        assert!((sphere_rotation_radians(0.0) - 0.0).abs() < 1e-12);
        assert!((sphere_rotation_radians(180.0) - std::f64::consts::PI).abs() < 1e-12);
        assert!((sphere_rotation_radians(450.0) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_validate_accepts_range() {
        assert_eq!(validate_north_offset(0.0), Ok(0.0));
        assert_eq!(validate_north_offset(275.0), Ok(275.0));
        assert_eq!(validate_north_offset(359.999), Ok(359.999));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(validate_north_offset(360.0).is_err());
        assert!(validate_north_offset(-0.5).is_err());
        assert!(validate_north_offset(720.0).is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        assert!(validate_north_offset(f64::NAN).is_err());
        assert!(validate_north_offset(f64::INFINITY).is_err());
    }

    #[test]
    fn test_format_heading() {
        assert_eq!(format_heading(125.0), "125°");
        assert_eq!(format_heading(0.4), "0°");
        assert_eq!(format_heading(89.6), "90°");
    }

    #[test]
    fn test_format_heading_rounds_up_to_zero() {
        assert_eq!(format_heading(359.6), "0°");
    }
}
