use regex::Regex;

/// Service types are lowercase slugs like "plumbing" or "ac_repair".
pub fn validate_service_type(service_type: &str) -> bool {
    let re = Regex::new(r"^[a-z][a-z0-9_-]{1,47}$").unwrap();
    re.is_match(service_type)
}

pub fn validate_coordinates(latitude: f64, longitude: f64) -> bool {
    (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_type_slugs() {
        assert!(validate_service_type("plumbing"));
        assert!(validate_service_type("ac_repair"));
        assert!(validate_service_type("tile-work"));
        assert!(!validate_service_type("Plumbing"));
        assert!(!validate_service_type("a"));
        assert!(!validate_service_type("has space"));
        assert!(!validate_service_type(""));
    }

    #[test]
    fn coordinate_ranges() {
        assert!(validate_coordinates(31.79, -7.09));
        assert!(validate_coordinates(-90.0, 180.0));
        assert!(!validate_coordinates(90.5, 0.0));
        assert!(!validate_coordinates(0.0, -180.5));
    }
}
