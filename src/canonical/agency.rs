//! Agency identity normalization.
//!
//! The raw agency field is a free-text city name ("SAN DIEGO", "Chula
//! Vista"). Classification walks a fixed, ordered rule table; the first
//! matching rule wins, so the sheriff substring rule takes priority over
//! the exact-name fallbacks below it. The mapping is total: every input,
//! including a missing one, yields a non-empty short code.

enum Rule {
    Equals(&'static str),
    Contains(&'static str),
}

/// Rule order is load-bearing; do not reorder.
const RULES: &[(Rule, &str)] = &[
    (Rule::Equals("SAN DIEGO"), "SDPD"),
    (Rule::Contains("SHERIFF"), "SDSO"),
    (Rule::Contains("SD COUNTY"), "SDSO"),
    (Rule::Equals("CHULA VISTA"), "CVPD"),
    (Rule::Equals("OCEANSIDE"), "OPD"),
    (Rule::Equals("ESCONDIDO"), "EPD"),
    (Rule::Equals("CARLSBAD"), "CPD"),
    (Rule::Equals("EL CAJON"), "ECPD"),
    (Rule::Equals("NATIONAL CITY"), "NCPD"),
    (Rule::Equals("LA MESA"), "LMPD"),
    (Rule::Equals("CORONADO"), "CoronPD"),
    (Rule::Equals("VISTA"), "VPD"),
];

pub const UNKNOWN_AGENCY: &str = "UNKNOWN";

/// Canonical short code for a raw agency string. Unmatched values fall
/// back to the uppercased raw name with spaces removed; missing or empty
/// input maps to [`UNKNOWN_AGENCY`].
pub fn short_code(raw: Option<&str>) -> String {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return UNKNOWN_AGENCY.to_string(),
    };
    let upper = raw.to_uppercase();
    for (rule, code) in RULES {
        let hit = match rule {
            Rule::Equals(name) => upper == *name,
            Rule::Contains(part) => upper.contains(part),
        };
        if hit {
            return (*code).to_string();
        }
    }
    upper.replace(' ', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_agencies_map_to_short_codes() {
        assert_eq!(short_code(Some("SAN DIEGO")), "SDPD");
        assert_eq!(short_code(Some("san diego")), "SDPD");
        assert_eq!(short_code(Some("Chula Vista")), "CVPD");
        assert_eq!(short_code(Some("CORONADO")), "CoronPD");
        assert_eq!(short_code(Some("VISTA")), "VPD");
    }

    #[test]
    fn sheriff_rule_beats_name_fallback() {
        assert_eq!(short_code(Some("SD COUNTY SHERIFF")), "SDSO");
        assert_eq!(short_code(Some("San Diego County Sheriff's Dept")), "SDSO");
        assert_eq!(short_code(Some("SD COUNTY")), "SDSO");
    }

    #[test]
    fn chula_vista_is_not_vista() {
        // Exact-match rules must not shadow each other.
        assert_eq!(short_code(Some("CHULA VISTA")), "CVPD");
    }

    #[test]
    fn fallback_uppercases_and_strips_spaces() {
        assert_eq!(short_code(Some("Santee")), "SANTEE");
        assert_eq!(short_code(Some("Solana Beach")), "SOLANABEACH");
    }

    #[test]
    fn mapping_is_total_and_never_empty() {
        for raw in [None, Some(""), Some("   "), Some("x"), Some("SAN DIEGO")] {
            assert!(!short_code(raw).is_empty());
        }
        assert_eq!(short_code(None), UNKNOWN_AGENCY);
        assert_eq!(short_code(Some("  ")), UNKNOWN_AGENCY);
    }
}
