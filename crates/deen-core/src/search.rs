use std::time::{Duration, Instant};

use deen_config::search::SearchConfig;
use regex::{Regex, RegexBuilder, RegexSet, RegexSetBuilder};

use crate::pattern::{SearchPattern, make_search_pattern};
use crate::progress::{ProgressThrottle, percent};

/// Where in a line a hit earns points. One point per regex that matches.
const SCORE_PREFIXES: [&str; 5] = [
    // very beginning of an entry: German at line start, English after "::"
    r"(?:^|::\s*)",
    // ...important enough to count twice
    r"(?:^|::\s*)",
    // beginning of a sub-entry
    r"(?:^|::\s*|\|\s*)",
    // English verb (":: to sprint")
    r"::\s*to\s+",
    // beginning of a word
    r"\b",
];

/// Term followed only by `{f}`, `[Br.]` or `(...)` annotations up to the end of
/// the entry, sub-entry or list item
const ANNOTATION_TAIL: &str =
    r"(?:\s*\{[^}|]*\}|\s*\[[^\]|]*\]|\s*\([^)|]*\))*\s*(?:$|::|\||;)";

const SCORE_SET_SIZE_LIMIT: usize = 64 * (1 << 20);

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Invalid search pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Lines scanned between clock checks
    pub check_interval_lines: usize,
    pub initial_report: Duration,
    pub report_interval: Duration,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            check_interval_lines: config.check_interval_lines,
            initial_report: Duration::from_millis(config.initial_report_ms),
            report_interval: Duration::from_millis(config.report_interval_ms),
        }
    }
}

/// Matching lines, best first, plus the loose pattern for highlighting
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchOutcome {
    pub pattern: String,
    pub matches: Vec<String>,
}

/// The scoring battery for one search pattern
pub struct Scorer {
    set: RegexSet,
}

impl Scorer {
    pub fn new(pattern: &SearchPattern) -> Result<Self, regex::Error> {
        let mut sources = Vec::with_capacity(SCORE_PREFIXES.len() * 2 * 4 * 2);
        for prefix in SCORE_PREFIXES {
            for body in [&pattern.loose, &pattern.strict] {
                let base = format!("{prefix}{body}");
                // the word boundary suffix is listed twice: whole words get double points
                for variant in [
                    base.clone(),
                    format!(r"{base}\b"),
                    format!(r"{base}\b"),
                    format!("{base}{ANNOTATION_TAIL}"),
                ] {
                    sources.push(format!("(?i){variant}"));
                    sources.push(variant);
                }
            }
        }

        let set = RegexSetBuilder::new(sources)
            .size_limit(SCORE_SET_SIZE_LIMIT)
            .build()?;
        Ok(Self { set })
    }

    pub fn score(&self, line: &str) -> u32 {
        self.set.matches(line).iter().count() as u32
    }
}

fn compile_matcher(pattern: &SearchPattern) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&pattern.loose)
        .case_insensitive(true)
        .build()
}

/// Search the dictionary for a cleaned, non-empty term.
///
/// Matching lines are stably sorted by descending score, so ties keep
/// dictionary order. `on_progress` receives rate-limited scan percentages;
/// if any report below 100% was made, a final 100% report follows.
pub fn search_dict(
    lines: &[String],
    what: &str,
    options: &SearchOptions,
    mut on_progress: impl FnMut(f64),
) -> Result<SearchOutcome, SearchError> {
    if what.is_empty() || lines.is_empty() {
        return Ok(SearchOutcome::default());
    }

    let pattern = make_search_pattern(what);
    // a term made only of wildcards
    if pattern.loose.is_empty() {
        return Ok(SearchOutcome::default());
    }

    let matcher = compile_matcher(&pattern)?;
    let scorer = Scorer::new(&pattern)?;

    let started = Instant::now();
    let mut throttle = ProgressThrottle::new(options.initial_report, options.report_interval);
    let check_every = options.check_interval_lines.max(1);
    let mut until_check = check_every;
    let total = lines.len() as u64;

    let mut scored: Vec<(&String, u32)> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if matcher.is_match(line) {
            scored.push((line, scorer.score(line)));
        }

        until_check -= 1;
        if until_check == 0 {
            until_check = check_every;
            if let Some(p) = throttle.poll(percent(i as u64 + 1, total)) {
                on_progress(p);
            }
        }
    }

    // sort_by is stable
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    let matches: Vec<String> = scored.into_iter().map(|(line, _)| line.clone()).collect();

    tracing::debug!(
        "Search for /{}/ found {} matches in {:?}",
        pattern.loose,
        matches.len(),
        started.elapsed()
    );

    if let Some(p) = throttle.finish() {
        on_progress(p);
    }

    Ok(SearchOutcome {
        pattern: pattern.loose,
        matches,
    })
}
