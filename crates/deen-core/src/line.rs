//! Decoding of single dictionary lines: `German side :: English side`,
//! each side a `|`-separated list of sub-entries.

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LineError {
    #[error("Expected exactly one '::' but found {separators} in line {line:?}")]
    Separator { line: String, separators: usize },

    #[error("Sub-entry count mismatch ({german} German, {english} English) in line {line:?}")]
    SubEntryMismatch {
        line: String,
        german: usize,
        english: usize,
    },
}

/// A German/English translation pair
pub type Translation = (String, String);

/// Decode one trimmed, non-comment line into parallel translation pairs
pub fn decode_line(line: &str) -> Result<Vec<Translation>, LineError> {
    let sides: Vec<&str> = line.split("::").collect();
    let [german, english] = sides[..] else {
        return Err(LineError::Separator {
            line: line.to_string(),
            separators: sides.len() - 1,
        });
    };

    let german: Vec<&str> = german.split('|').map(str::trim).collect();
    let english: Vec<&str> = english.split('|').map(str::trim).collect();
    if german.len() != english.len() {
        return Err(LineError::SubEntryMismatch {
            line: line.to_string(),
            german: german.len(),
            english: english.len(),
        });
    }

    Ok(german
        .into_iter()
        .zip(english)
        .map(|(de, en)| (de.to_string(), en.to_string()))
        .collect())
}

/// Number of sub-entries in a line, without allocating the pairs
pub fn count_sub_entries(line: &str) -> Result<usize, LineError> {
    let mut sides = line.split("::");
    let (Some(german), Some(english), None) = (sides.next(), sides.next(), sides.next()) else {
        return Err(LineError::Separator {
            line: line.to_string(),
            separators: line.matches("::").count(),
        });
    };

    let (german, english) = (german.split('|').count(), english.split('|').count());
    if german != english {
        return Err(LineError::SubEntryMismatch {
            line: line.to_string(),
            german,
            english,
        });
    }
    Ok(german)
}

/// Total sub-entries over all lines. Malformed lines are logged and skipped.
pub fn count_entries<S: AsRef<str>>(lines: &[S]) -> usize {
    lines
        .iter()
        .map(|line| match count_sub_entries(line.as_ref()) {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Skipping line: {e}");
                0
            }
        })
        .sum()
}
