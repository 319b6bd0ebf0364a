use unicode_normalization::UnicodeNormalization;

/// Normalize a raw search term: NFC composition (so combining marks typed
/// separately match the precomposed dictionary text), whitespace runs
/// collapsed to one space, ends trimmed.
///
/// Must be idempotent, the term is cleaned on both sides of the protocol.
pub fn clean_search_term(what: &str) -> String {
    let composed: String = what.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapse_and_trim() {
        assert_eq!(clean_search_term("  to \t run\n "), "to run");
        assert_eq!(clean_search_term(""), "");
        assert_eq!(clean_search_term(" \u{3000} "), "");
    }

    #[test]
    fn test_composes_umlauts() {
        assert_eq!(clean_search_term("Ha\u{0308}user"), "Häuser");
    }

    #[test]
    fn test_idempotent() {
        for input in [
            "",
            "  a  b  ",
            "Stra\u{00df}e",
            "\u{0308}leading mark",
            "x\u{00a0}\u{00a0}y",
            "foo * * bar",
            "\r\n",
        ] {
            let once = clean_search_term(input);
            assert_eq!(clean_search_term(&once), once, "input {input:?}");
        }
    }
}
