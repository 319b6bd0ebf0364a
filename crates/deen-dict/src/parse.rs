use std::borrow::Cow;
use std::sync::LazyLock;

use deen_core::Dictionary;
use deen_core::line::count_entries;
use deen_types::DictStats;
use regex::Regex;

use crate::error::LoadError;

static STATS_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Stats:\s*([\d,]+)\s+entries\s*\(\s*([\d,]+)\s+main\s*\+\s*([\d,]+)\s+additional\s*,\s*([\d,]+)\s+1:1\s+translations\s*\)",
    )
    .expect("stats comment regex is valid")
});

/// Counts announced by the dictionary's header comment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclaredStats {
    pub entries: usize,
    pub main: usize,
    pub additional: usize,
    pub one_to_one: usize,
}

pub fn parse_stats_comment(line: &str) -> Option<DeclaredStats> {
    let caps = STATS_COMMENT.captures(line)?;
    let number = |i: usize| caps.get(i)?.as_str().replace(',', "").parse::<usize>().ok();
    Some(DeclaredStats {
        entries: number(1)?,
        main: number(2)?,
        additional: number(3)?,
        one_to_one: number(4)?,
    })
}

/// Repair C1 control characters left over from a CP1252 conversion
pub fn fix_cp1252_leftovers(text: &str) -> Cow<'_, str> {
    if text.contains(['\u{92}', '\u{96}']) {
        Cow::Owned(text.replace('\u{92}', "\u{2019}").replace('\u{96}', "\u{2013}"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Split on CRLF, LF or lone CR
pub fn raw_lines(text: &str) -> impl Iterator<Item = &str> {
    text.split('\n').flat_map(|line| {
        let line = line.strip_suffix('\r').unwrap_or(line);
        line.split('\r')
    })
}

/// Turn decompressed dictionary text into a [`Dictionary`].
///
/// Blank lines and `#` comments are dropped. The header's 1:1 translation
/// count is kept only when its other counts agree with what was parsed.
pub fn parse_dictionary(text: &str, stats_scan_lines: usize) -> Result<Dictionary, LoadError> {
    let text = fix_cp1252_leftovers(text);
    let mut declared = None;
    let mut lines = Vec::new();

    for (i, raw) in raw_lines(&text).enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            if declared.is_none() && i < stats_scan_lines {
                declared = parse_stats_comment(line);
            }
            continue;
        }
        lines.push(line.to_string());
    }

    if lines.len() <= 1 {
        return Err(LoadError::TooFewLines(lines.len()));
    }

    let entries = count_entries(&lines);
    let one_to_one = declared.and_then(|d| {
        let consistent =
            d.entries == entries && d.main == lines.len() && d.main + d.additional == d.entries;
        if consistent {
            Some(d.one_to_one)
        } else {
            tracing::warn!(
                "Ignoring header stats {:?}, parsed {} lines with {} entries",
                d,
                lines.len(),
                entries
            );
            None
        }
    });

    tracing::debug!("Parsed {} lines, {} entries", lines.len(), entries);
    let stats = DictStats {
        lines: lines.len(),
        entries,
        one_to_one,
    };
    Ok(Dictionary::new(lines, stats))
}
