//! Country flag emoji for tickers and indices

/// Yahoo exchange suffix to ISO 3166-1 alpha-2 country code
const SUFFIX_COUNTRIES: &[(&str, &str)] = &[
    ("ST", "SE"),
    ("L", "GB"),
    ("DE", "DE"),
    ("F", "DE"),
    ("PA", "FR"),
    ("T", "JP"),
    ("HK", "HK"),
    ("TO", "CA"),
    ("AS", "NL"),
    ("SW", "CH"),
    ("OL", "NO"),
    ("CO", "DK"),
    ("HE", "FI"),
    ("MI", "IT"),
    ("MC", "ES"),
    ("AX", "AU"),
    ("NS", "IN"),
    ("BO", "IN"),
    ("SS", "CN"),
    ("SZ", "CN"),
    ("KS", "KR"),
];

const REGIONAL_INDICATOR_A: u32 = 0x1F1E6;

/// Flag emoji for a two-letter country code
pub fn flag_emoji(iso2: &str) -> Option<String> {
    if iso2.len() != 2 || !iso2.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    iso2.to_ascii_uppercase()
        .chars()
        .map(|c| char::from_u32(REGIONAL_INDICATOR_A + (c as u32 - 'A' as u32)))
        .collect()
}

/// Country of listing inferred from the ticker's exchange suffix
///
/// Tickers without a suffix are treated as US listings. Unknown suffixes
/// yield `None`.
pub fn country_for_suffix(ticker: &str) -> Option<&'static str> {
    let Some((_, suffix)) = ticker.rsplit_once('.') else {
        return Some("US");
    };

    SUFFIX_COUNTRIES
        .iter()
        .find(|(s, _)| s.eq_ignore_ascii_case(suffix))
        .map(|(_, country)| *country)
}

/// Flag emoji for a ticker
pub fn flag_for_ticker(ticker: &str) -> Option<String> {
    country_for_suffix(ticker).and_then(flag_emoji)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_emoji() {
        assert_eq!(flag_emoji("SE").as_deref(), Some("🇸🇪"));
        assert_eq!(flag_emoji("us").as_deref(), Some("🇺🇸"));
        assert_eq!(flag_emoji("USA"), None);
        assert_eq!(flag_emoji("1A"), None);
        assert_eq!(flag_emoji(""), None);
    }

    #[test]
    fn test_country_for_suffix() {
        assert_eq!(country_for_suffix("ERIC-B.ST"), Some("SE"));
        assert_eq!(country_for_suffix("VOD.L"), Some("GB"));
        assert_eq!(country_for_suffix("7203.T"), Some("JP"));
        assert_eq!(country_for_suffix("RELIANCE.NS"), Some("IN"));
        assert_eq!(country_for_suffix("AAPL"), Some("US"));
        assert_eq!(country_for_suffix("BRK.XX"), None);
    }

    #[test]
    fn test_flag_for_ticker() {
        assert_eq!(flag_for_ticker("SAP.DE").as_deref(), Some("🇩🇪"));
        assert_eq!(flag_for_ticker("MSFT").as_deref(), Some("🇺🇸"));
        assert_eq!(flag_for_ticker("FOO.ZZ"), None);
    }
}
