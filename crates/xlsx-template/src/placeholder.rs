//! Placeholder token grammar: `##` + name + `##`.
//!
//! A name is a non-empty run of Unicode alphanumeric characters or `_`. Tokens are
//! case-sensitive and there is no escaping syntax for a literal `##`.

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Delimiter opening and closing every placeholder token.
pub const DELIMITER: &str = "##";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid placeholder name {0:?}: expected letters, digits or `_`")]
pub struct InvalidPlaceholder(pub String);

/// A validated placeholder name (without the surrounding `##`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Placeholder(String);

impl Placeholder {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidPlaceholder> {
        let name = name.into();
        if is_valid_name(&name) {
            Ok(Self(name))
        } else {
            Err(InvalidPlaceholder(name))
        }
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    /// The literal token as it appears in cell text, e.g. `##Revenue_Q1##`.
    pub fn token(&self) -> String {
        format!("{DELIMITER}{}{DELIMITER}", self.0)
    }

    pub fn into_name(self) -> String {
        self.0
    }
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{DELIMITER}{}{DELIMITER}", self.0)
    }
}

impl FromStr for Placeholder {
    type Err = InvalidPlaceholder;

    /// Accepts either a bare name (`Status_A`) or a full token (`##Status_A##`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s
            .strip_prefix(DELIMITER)
            .and_then(|rest| rest.strip_suffix(DELIMITER))
            .unwrap_or(s);
        Self::new(name)
    }
}

impl AsRef<str> for Placeholder {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// Scan `text` left to right and rewrite placeholder tokens.
///
/// `resolve(name, out)` appends the replacement to `out` and returns `true`, or returns `false`
/// to leave the token verbatim. A resolved token consumes both delimiters; an unresolved one
/// releases its closing `##` so it can open the following token. Replacement text is never
/// scanned again.
pub(crate) fn replace_tokens<'a>(
    text: &'a str,
    mut resolve: impl FnMut(&str, &mut String) -> bool,
) -> Cow<'a, str> {
    let mut out: Option<String> = None;
    let mut copied = 0usize;
    let mut search = 0usize;

    while let Some(rel_open) = text[search..].find(DELIMITER) {
        let open = search + rel_open;
        let name_start = open + DELIMITER.len();
        let Some(rel_close) = text[name_start..].find(DELIMITER) else {
            break;
        };
        let close = name_start + rel_close;
        let name = &text[name_start..close];

        if !is_valid_name(name) {
            // `###A##` still contains `##A##` one byte further on.
            search = open + 1;
            continue;
        }

        let buf = out.get_or_insert_with(|| String::with_capacity(text.len()));
        let mark = buf.len();
        buf.push_str(&text[copied..open]);
        if resolve(name, buf) {
            copied = close + DELIMITER.len();
            search = copied;
        } else {
            buf.truncate(mark);
            search = close;
        }
    }

    match out {
        Some(mut buf) if copied > 0 => {
            buf.push_str(&text[copied..]);
            Cow::Owned(buf)
        }
        _ => Cow::Borrowed(text),
    }
}

/// Placeholder names in `text`, in order of appearance (duplicates included).
pub fn placeholders_in(text: &str) -> Vec<&str> {
    let mut found = Vec::new();
    let mut search = 0usize;
    while let Some(rel_open) = text[search..].find(DELIMITER) {
        let open = search + rel_open;
        let name_start = open + DELIMITER.len();
        let Some(rel_close) = text[name_start..].find(DELIMITER) else {
            break;
        };
        let close = name_start + rel_close;
        let name = &text[name_start..close];
        if is_valid_name(name) {
            found.push(name);
            search = close;
        } else {
            search = open + 1;
        }
    }
    found
}
