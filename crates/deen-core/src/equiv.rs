//! Character equivalences used to broaden searches.
//!
//! A search for any string in the left list also finds the strings in the
//! right list. An empty right list means every string in the left list is
//! equivalent to every other one. This lets users type ASCII and still find
//! umlauts, ligatures, sub/superscripts and typographic punctuation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

/// The wildcard is split out of search terms separately and may never be a key
pub const WILDCARD: &str = "*";

type EquivTable = &'static [(&'static [&'static str], &'static [&'static str])];

const EQUIV: EquivTable = &[
    // "a" matches "a" or "ä", "A" matches "A" or "Ä"
    (&["a"], &["ä"]),
    (&["A"], &["Ä"]),
    // "ae" and "ä" both match either
    (&["ae", "ä"], &[]),
    (&["AE", "Ae", "Ä"], &[]),
    (&["o"], &["ö"]),
    (&["O"], &["Ö"]),
    (&["oe", "ö"], &[]),
    (&["OE", "Oe", "Ö"], &[]),
    (&["u"], &["ü"]),
    (&["U"], &["Ü"]),
    (&["ue", "ü"], &[]),
    (&["UE", "Ue", "Ü"], &[]),
    (&["ss", "sz"], &["ß"]),
    (&["ß"], &["ss"]),
    (&["e"], &["ë"]),
    (&["i"], &["ï"]),
    (&["A"], &["Á"]),
    (&["E"], &["É"]),
    (&["I"], &["Î"]),
    (&["a"], &["á"]),
    (&["e"], &["é"]),
    (&["i"], &["í"]),
    (&["o"], &["ó"]),
    (&["a"], &["à"]),
    (&["e"], &["è"]),
    (&["i"], &["ì"]),
    (&["o"], &["ò"]),
    (&["a"], &["â"]),
    (&["e"], &["ê"]),
    (&["i"], &["î"]),
    (&["o"], &["ô"]),
    (&["u"], &["û"]),
    (&["a"], &["ã"]),
    (&["n"], &["ñ"]),
    (&["i"], &["ī"]),
    (&["c"], &["ç"]),
    (&["S"], &["Š"]),
    (&["a"], &["å"]),
    (&["ae"], &["æ"]),
    (&["l"], &["ł"]),
    // greek letters
    (&["alpha"], &["α"]),
    (&["lambda", "lamda"], &["λ"]),
    (&["omega", "ohm"], &["Ω"]),
    // punctuation
    (&["'", "’", "ʽ"], &[]),
    (&["-", "–", "⁻"], &[]),
    (&["...", "…"], &[]),
    (&["\"", "“", "”", "„"], &[]),
    // sub- and superscripts
    (&["0"], &["₀", "⁰"]),
    (&["1"], &["₁", "¹"]),
    (&["2"], &["₂", "²"]),
    (&["3"], &["₃", "³"]),
    (&["4"], &["₄", "⁴"]),
    (&["5"], &["₅", "⁵"]),
    (&["6"], &["₆", "⁶"]),
    (&["7"], &["₇", "⁷"]),
    (&["8"], &["₈", "⁸"]),
    (&["9"], &["₉", "⁹"]),
    // other sequences
    (&["1/2"], &["½"]),
    (&["x"], &["×"]),
    (&["(R)"], &["®"]),
    (&["(c)", "(C)"], &["©"]),
];

#[derive(Debug, thiserror::Error)]
pub enum EquivError {
    #[error("Empty entry in equivalence table")]
    EmptyEntry,

    #[error("Reserved token used as equivalence key: {0}")]
    ReservedKey(String),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// Compiled equivalence table
#[derive(Debug)]
pub struct Equivalences {
    /// Matches any key, longest keys first, plus a bare wildcard
    splitter: Regex,
    /// Regex fragment each key expands to
    replacements: BTreeMap<String, String>,
}

static BUILTIN: LazyLock<Equivalences> = LazyLock::new(|| {
    Equivalences::compile(EQUIV).expect("built-in equivalence table is valid")
});

/// The process-wide equivalences built from the static table
pub fn builtin() -> &'static Equivalences {
    &BUILTIN
}

/// Longest first; ties in lexicographic order so the output is deterministic
fn longest_first(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut items: Vec<String> = items.into_iter().collect();
    items.sort();
    items.sort_by_key(|s| std::cmp::Reverse(s.chars().count()));
    items
}

fn fragment(equivalents: &[String]) -> String {
    match equivalents {
        [single] => regex::escape(single),
        many if many.iter().all(|s| s.chars().count() == 1) => {
            let class: String = many.iter().map(|s| regex::escape(s)).collect();
            format!("[{class}]")
        }
        many => {
            let alts: Vec<String> = many.iter().map(|s| regex::escape(s)).collect();
            format!("(?:{})", alts.join("|"))
        }
    }
}

impl Equivalences {
    pub fn compile(table: EquivTable) -> Result<Self, EquivError> {
        let mut sets: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for (keys, equivalents) in table {
            if keys.is_empty() {
                return Err(EquivError::EmptyEntry);
            }
            for key in keys.iter() {
                if key.is_empty() || equivalents.iter().any(|e| e.is_empty()) {
                    return Err(EquivError::EmptyEntry);
                }
                if *key == WILDCARD {
                    return Err(EquivError::ReservedKey(key.to_string()));
                }
                let set = sets.entry(key.to_string()).or_default();
                if equivalents.is_empty() {
                    set.extend(keys.iter().map(|s| s.to_string()));
                } else {
                    set.insert(key.to_string());
                    set.extend(equivalents.iter().map(|s| s.to_string()));
                }
            }
        }

        let keys = longest_first(sets.keys().cloned());
        let mut alternation: Vec<String> = keys.iter().map(|k| regex::escape(k)).collect();
        alternation.push(regex::escape(WILDCARD));
        let splitter = Regex::new(&alternation.join("|"))?;

        let replacements = sets
            .into_iter()
            .map(|(key, set)| {
                let equivalents = longest_first(set);
                (key, fragment(&equivalents))
            })
            .collect();

        Ok(Self {
            splitter,
            replacements,
        })
    }

    /// Split a term into keys, wildcards and the plain text between them
    pub fn tokenize<'a>(&self, term: &'a str) -> Vec<&'a str> {
        let mut parts = Vec::new();
        let mut last = 0;
        for m in self.splitter.find_iter(term) {
            if m.start() > last {
                parts.push(&term[last..m.start()]);
            }
            parts.push(m.as_str());
            last = m.end();
        }
        if last < term.len() {
            parts.push(&term[last..]);
        }
        parts
    }

    /// Regex fragment for a key, `None` if the token has no equivalents
    pub fn replacement(&self, token: &str) -> Option<&str> {
        self.replacements.get(token).map(String::as_str)
    }
}
