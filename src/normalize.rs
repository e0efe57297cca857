//! Heading normalization.
//!
//! The normalized form is both the cache key and the outgoing query string,
//! so two spellings of the same heading share one cache entry and one
//! network call.

/// Canonicalize a raw heading string.
///
/// Steps, in order:
/// 1. collapse all whitespace runs to single spaces and trim the ends
/// 2. remove spaces immediately before or after a hyphen
///    (`United States -- History` becomes `United States--History`)
/// 3. strip the trailing run of full stops, spaces included, so stripping
///    a stop can never leave new trailing whitespace behind
///
/// No casing changes. Idempotent: `normalize(normalize(s)) == normalize(s)`.
#[must_use]
pub fn normalize(heading: &str) -> String {
    let collapsed = heading.split_whitespace().collect::<Vec<_>>().join(" ");
    let hyphenated = collapsed.replace(" -", "-").replace("- ", "-");
    hyphenated.trim_end_matches(['.', ' ']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_whitespace() {
        assert_eq!(normalize("  Stevenson,\t Adlai \n"), "Stevenson, Adlai");
    }

    #[test]
    fn test_hyphen_spacing_and_trailing_stop() {
        assert_eq!(
            normalize("United States -- History."),
            "United States--History"
        );
        assert_eq!(normalize("United States --History"), "United States--History");
        assert_eq!(normalize("United States-- History"), "United States--History");
    }

    #[test]
    fn test_internal_spacing_preserved() {
        // Commas keep their spacing; only hyphens are tightened.
        assert_eq!(normalize("Smith , John"), "Smith , John");
    }

    #[test]
    fn test_trailing_stops_all_stripped() {
        assert_eq!(normalize("etc.."), "etc");
        assert_eq!(normalize("plain"), "plain");
    }

    #[test]
    fn test_space_before_trailing_stop() {
        // Stripping the stop must not leave the space behind; both
        // spellings share one cache key.
        assert_eq!(normalize("a ."), "a");
        assert_eq!(normalize("a . ."), "a");
        assert_eq!(normalize("a ."), normalize("a "));
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "   ",
            "United States -- History.",
            "Smith , John",
            "a - b - c.",
            "a .",
            "a . .",
            "trailing..",
            "already--tight",
        ];
        for s in samples {
            let once = normalize(s);
            assert_eq!(normalize(&once), once, "not idempotent for {s:?}");
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" . "), "");
    }
}
