//! Game file naming module
//!
//! Stored games follow the `white_black_year.pgn` convention. This module turns
//! such a file name into a display label like `Magnus vs Hikaru - 2021`.

use std::fmt;

/// Players and year decoded from a stored file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameName {
    pub white: String,
    pub black: String,
    pub year: String,
}

/// Reasons a file name does not follow `white_black_year.ext`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("expected 3 '_'-separated parts, found {0}")]
    PartCount(usize),
    #[error("empty {0} segment")]
    EmptyPart(&'static str),
}

impl GameName {
    /// Parse `white_black_year.<extension>`
    ///
    /// The extension is stripped only when it matches; a name without it is
    /// parsed as-is.
    pub fn parse(file_name: &str, extension: &str) -> Result<Self, NameError> {
        let stem = strip_extension(file_name, extension);
        let parts: Vec<&str> = stem.split('_').collect();

        let [white, black, year] = parts.as_slice() else {
            return Err(NameError::PartCount(parts.len()));
        };

        for (label, part) in [("white", white), ("black", black), ("year", year)] {
            if part.is_empty() {
                return Err(NameError::EmptyPart(label));
            }
        }

        Ok(Self {
            white: (*white).to_string(),
            black: (*black).to_string(),
            year: (*year).to_string(),
        })
    }
}

impl fmt::Display for GameName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} vs {} - {}",
            capitalize(&self.white),
            capitalize(&self.black),
            self.year
        )
    }
}

/// Display label for a stored file, falling back to the raw file name when
/// it does not follow the naming convention
pub fn friendly_name(file_name: &str, extension: &str) -> String {
    GameName::parse(file_name, extension)
        .map_or_else(|_| file_name.to_string(), |name| name.to_string())
}

fn strip_extension<'a>(file_name: &'a str, extension: &str) -> &'a str {
    file_name
        .strip_suffix(extension)
        .and_then(|rest| rest.strip_suffix('.'))
        .unwrap_or(file_name)
}

/// Uppercase the first character, leave the rest untouched
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
