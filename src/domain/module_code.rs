use std::{fmt, ops::Deref, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

/// The pattern a module code must match.
///
/// Two or three uppercase letters (or one of a handful of faculty prefixes
/// that are sometimes written with a trailing space), four digits, then an
/// optional suffix letter or letter followed by `R`.
pub const MODULE_CODE_PATTERN: &str =
    r"(?:[A-Z]{2,3}|MUT |CE |ME |MUA )[0-9]{4}(?:[A-Z]|[A-Z]R)?";

static EMBEDDED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(MODULE_CODE_PATTERN).expect("module code pattern is valid"));

static EXACT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("^(?:{MODULE_CODE_PATTERN})$")).expect("module code pattern is valid")
});

/// A validated module code, such as `CS1010` or `MA1101R`.
///
/// Module codes are case-sensitive and used as leaves of prerequisite
/// expressions and as keys when resolving preclusions.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleCode(String);

impl ModuleCode {
    /// Creates a new `ModuleCode` from a string.
    ///
    /// # Errors
    ///
    /// Returns `InvalidModuleCodeError` if the whole string is not a single
    /// module code.
    pub fn new(s: String) -> Result<Self, InvalidModuleCodeError> {
        if is_single(&s) {
            Ok(Self(s))
        } else {
            Err(InvalidModuleCodeError(s))
        }
    }

    /// Wraps text already known to match [`MODULE_CODE_PATTERN`].
    pub(crate) fn from_match(s: &str) -> Self {
        Self(s.to_string())
    }

    /// Every module code embedded in `text`, in order of appearance.
    ///
    /// ```
    /// use modmaven::ModuleCode;
    ///
    /// let codes: Vec<_> = ModuleCode::find_all("CS1010 or its equivalent, MA1101R")
    ///     .map(|code| code.to_string())
    ///     .collect();
    /// assert_eq!(codes, ["CS1010", "MA1101R"]);
    /// ```
    pub fn find_all(text: &str) -> impl Iterator<Item = Self> + '_ {
        EMBEDDED.find_iter(text).map(|m| Self::from_match(m.as_str()))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Whether `text` consists of exactly one module code and nothing else.
#[must_use]
pub fn is_single(text: &str) -> bool {
    EXACT.is_match(text)
}

impl TryFrom<String> for ModuleCode {
    type Error = InvalidModuleCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for ModuleCode {
    type Error = InvalidModuleCodeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value.to_string())
    }
}

impl From<ModuleCode> for String {
    fn from(code: ModuleCode) -> Self {
        code.0
    }
}

impl AsRef<str> for ModuleCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for ModuleCode {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ModuleCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ModuleCode {
    type Err = InvalidModuleCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_string())
    }
}

/// Error returned when a string is not a single module code.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("Invalid module code '{0}': expected 2-3 uppercase letters, 4 digits and an optional suffix")]
pub struct InvalidModuleCodeError(String);
