use crate::equiv::{self, Equivalences, WILDCARD};

/// Non-greedy "anything" used for wildcards
const ANY: &str = ".*?";

/// Regex sources for one search term.
///
/// Neither contains anchors or capturing groups: callers splice them into
/// larger expressions and reuse `loose` for highlighting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchPattern {
    /// Only metacharacters escaped; used to reward exact matches
    pub strict: String,
    /// Equivalences and wildcards expanded; used for matching
    pub loose: String,
}

/// Build the search pattern for a term cleaned with `clean_search_term`
pub fn make_search_pattern(what: &str) -> SearchPattern {
    make_search_pattern_with(equiv::builtin(), what)
}

pub fn make_search_pattern_with(equivalences: &Equivalences, what: &str) -> SearchPattern {
    let mut tokens = equivalences.tokenize(what);
    // a run of wildcards acts as one
    tokens.dedup_by(|a, b| *a == WILDCARD && *b == WILDCARD);
    let last = tokens.len().saturating_sub(1);

    let mut pattern = SearchPattern::default();
    for (i, token) in tokens.iter().copied().enumerate() {
        if token == WILDCARD {
            // without anchors a leading or trailing wildcard matches nothing extra
            if i == 0 || i == last {
                continue;
            }
            pattern.strict.push_str(ANY);
            pattern.loose.push_str(ANY);
            continue;
        }

        let escaped = regex::escape(token);
        match equivalences.replacement(token) {
            Some(fragment) => pattern.loose.push_str(fragment),
            None => pattern.loose.push_str(&escaped),
        }
        pattern.strict.push_str(&escaped);
    }
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::RegexBuilder;

    fn loose_matches(term: &str, line: &str) -> bool {
        let pat = make_search_pattern(term);
        RegexBuilder::new(&pat.loose)
            .case_insensitive(true)
            .build()
            .unwrap()
            .is_match(line)
    }

    /// True if `pat` contains `c` outside of an escape sequence
    fn has_unescaped(pat: &str, c: char) -> bool {
        let mut escaped = false;
        for ch in pat.chars() {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == c {
                return true;
            }
        }
        false
    }

    /// True if `pat` opens a group that is not `(?:`
    fn has_capturing_group(pat: &str) -> bool {
        let chars: Vec<char> = pat.chars().collect();
        let mut escaped = false;
        for (i, ch) in chars.iter().enumerate() {
            if escaped {
                escaped = false;
            } else if *ch == '\\' {
                escaped = true;
            } else if *ch == '(' && chars.get(i + 1) != Some(&'?') {
                return true;
            }
        }
        false
    }

    #[test]
    fn test_empty_term() {
        assert_eq!(make_search_pattern(""), SearchPattern::default());
    }

    #[test]
    fn test_no_anchors_or_groups() {
        for term in [
            "Haus",
            "^start$",
            "(c) 1/2",
            "a|b",
            "[x]{2}",
            "foo*bar",
            "Straße",
            "to run",
            "lambda...",
            "\\d+",
            "Ähre (f)",
        ] {
            let pat = make_search_pattern(term);
            for src in [&pat.strict, &pat.loose] {
                assert!(!has_unescaped(src, '^'), "{term:?} -> {src}");
                assert!(!has_unescaped(src, '$'), "{term:?} -> {src}");
                assert!(!has_capturing_group(src), "{term:?} -> {src}");
            }
        }
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(make_search_pattern("Grüße*x"), make_search_pattern("Grüße*x"));
    }

    #[test]
    fn test_strict_is_literal() {
        let pat = make_search_pattern("a.b");
        assert_eq!(pat.strict, r"a\.b");
        assert_eq!(pat.loose, r"[aàáâãäå]\.b");
    }

    #[test]
    fn test_equivalence_symmetry() {
        assert!(loose_matches("Strasse", "Straße {f} :: street"));
        assert!(loose_matches("Straße", "Strasse :: street"));
        assert!(loose_matches("Mueller", "Müller {m} :: miller"));
        assert!(loose_matches("m2", "m² :: square metre"));
        assert!(!loose_matches("Strasse", "Strand :: beach"));
    }

    #[test]
    fn test_wildcards() {
        assert!(loose_matches("foo*bar", "foobar"));
        assert!(loose_matches("foo*bar", "foo xyz bar"));
        assert!(!loose_matches("foo*bar", "bar foo"));

        assert_eq!(make_search_pattern("foo**bar"), make_search_pattern("foo*bar"));
        assert_eq!(make_search_pattern("*foo"), make_search_pattern("foo"));
        assert_eq!(make_search_pattern("foo*"), make_search_pattern("foo"));
        assert_eq!(make_search_pattern("foo**"), make_search_pattern("foo"));
        assert_eq!(make_search_pattern("**foo"), make_search_pattern("foo"));
        assert_eq!(make_search_pattern("foo**bar").strict, "foo.*?bar");
        assert_eq!(make_search_pattern("***"), SearchPattern::default());

        let pat = make_search_pattern("foo*bar");
        assert!(pat.strict.contains(".*?"));
    }
}
