use crate::config::MatchConfig;

/// Minimal unique string for an address: city, street (if any) and
/// housenumber concatenated in that order.
///
/// No separators are inserted, so `("A", "B", "C")` and `("AB", None, "C")`
/// share a key. Postcode and SIMC code are not part of the key.
pub fn identity_key(
    city: &str,
    street: Option<&str>,
    housenumber: &str,
    config: &MatchConfig,
) -> String {
    let street = street.unwrap_or("");
    let mut key = String::with_capacity(city.len() + street.len() + housenumber.len());

    key.push_str(city);
    key.push_str(street);
    if config.case_insensitive_housenumber {
        key.push_str(&housenumber.to_lowercase());
    } else {
        key.push_str(housenumber);
    }

    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, Addressed, Point};

    fn addr(city: &str, street: Option<&str>, housenumber: &str) -> Address {
        Address::new(city, street, housenumber, Point::new(0.0, 0.0))
    }

    #[test]
    fn test_key_concatenates_fields() {
        let config = MatchConfig::default();
        assert_eq!(
            addr("Kraków", Some("Długa"), "5").identity_key(&config),
            "KrakówDługa5"
        );
        assert_eq!(addr("Zalesie", None, "7").identity_key(&config), "Zalesie7");
    }

    #[test]
    fn test_key_without_separators_collides() {
        let config = MatchConfig::default();
        assert_eq!(
            identity_key("A", Some("B"), "C", &config),
            identity_key("AB", Some(""), "C", &config)
        );
        assert_eq!(
            addr("A", Some("B"), "C").identity_key(&config),
            addr("AB", None, "C").identity_key(&config)
        );
        assert_eq!(
            identity_key("X", Some("1a"), "23", &config),
            identity_key("X", Some("1"), "a23", &config)
        );
    }

    #[test]
    fn test_housenumber_case_sensitive_by_default() {
        let config = MatchConfig::default();
        assert_ne!(
            addr("Wola", Some("Polna"), "12A").identity_key(&config),
            addr("Wola", Some("Polna"), "12a").identity_key(&config)
        );
    }

    #[test]
    fn test_housenumber_case_insensitive_mode() {
        let config = MatchConfig {
            case_insensitive_housenumber: true,
            ..Default::default()
        };
        assert_eq!(
            addr("Wola", Some("Polna"), "12A").identity_key(&config),
            addr("Wola", Some("Polna"), "12a").identity_key(&config)
        );
        // only the housenumber is folded
        assert_ne!(
            addr("Wola", Some("Polna"), "1").identity_key(&config),
            addr("wola", Some("polna"), "1").identity_key(&config)
        );
    }
}
