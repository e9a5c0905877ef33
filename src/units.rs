pub mod range {
    /// Parses `"24 - 32 °C"`, `"10 - 20"` or a single `"27"` into `(low, high)`.
    ///
    /// Trailing unit text is ignored. A single value yields equal ends.
    pub fn parse(text: &str) -> Option<(f32, f32)> {
        let mut numbers = text
            .split(|c: char| !(c.is_ascii_digit() || c == '.'))
            .filter(|token| !token.is_empty())
            .filter_map(|token| token.parse::<f32>().ok());

        let first = numbers.next()?;
        let (low, high) = match numbers.next() {
            Some(second) => (first, second),
            None => (first, first),
        };
        Some((low.min(high), low.max(high)))
    }

    #[test]
    fn test_parse() {
        assert_eq!(parse("24 - 32 °C"), Some((24.0, 32.0)));
        assert_eq!(parse("25 - 33&#8451;"), Some((25.0, 33.0)));
        assert_eq!(parse("10 - 20"), Some((10.0, 20.0)));
        assert_eq!(parse("27"), Some((27.0, 27.0)));
        assert_eq!(parse("20 - 10 km/h"), Some((10.0, 20.0)));
        assert_eq!(parse("--"), None);
        assert_eq!(parse(""), None);
    }
}

pub mod direction {
    const COMPASS: [&str; 16] = [
        "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW",
        "NW", "NNW",
    ];

    /// Bearing in degrees for a 16-point compass label such as `"NNE"`.
    pub fn compass_to_degree(point: &str) -> Option<f32> {
        let point = point.trim();
        COMPASS
            .iter()
            .position(|p| p.eq_ignore_ascii_case(point))
            .map(|idx| idx as f32 * 22.5)
    }

    #[test]
    fn test_compass_to_degree() {
        assert_eq!(compass_to_degree("N"), Some(0.0));
        assert_eq!(compass_to_degree("nne"), Some(22.5));
        assert_eq!(compass_to_degree("E"), Some(90.0));
        assert_eq!(compass_to_degree("S"), Some(180.0));
        assert_eq!(compass_to_degree("W"), Some(270.0));
        assert_eq!(compass_to_degree("VARIABLE"), None);
    }
}
