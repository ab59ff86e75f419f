//! Maps free-form language tags from front matter onto the locales the CMS space is configured with.
//!
//! Tags are matched case-sensitively: `EN` does not resolve. This is a known limitation,
//! kept so that a tag reaches the CMS exactly as the table lists it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical CMS locale codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Locale {
    EnUs,
    JaJp,
}

impl Locale {
    /// Locale holding the locale-independent fields (`slug`, `order`, `uuid`, `sha`).
    pub const CANONICAL: Locale = Locale::EnUs;

    pub fn code(self) -> &'static str {
        match self {
            Locale::EnUs => "en-US",
            Locale::JaJp => "ja-JP",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "en-US" => Ok(Locale::EnUs),
            "ja-JP" => Ok(Locale::JaJp),
            other => Err(format!("unsupported CMS locale `{other}`")),
        }
    }
}

impl TryFrom<String> for Locale {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Locale> for String {
    fn from(locale: Locale) -> Self {
        locale.code().to_string()
    }
}

// To support a new locale, add a variant above and a row here.
const LOCALE_TABLE: &[(&[&str], Locale)] = &[
    (&["en", "en-US", "en-us"], Locale::EnUs),
    (&["ja", "jp", "ja-JP", "ja-jp"], Locale::JaJp),
];

/// Resolves a language tag. `None` means "unresolved": the document must not be published.
pub fn resolve_locale(lang: Option<&str>) -> Option<Locale> {
    let lang = lang?;
    LOCALE_TABLE
        .iter()
        .find(|(tags, _)| tags.contains(&lang))
        .map(|(_, locale)| *locale)
}
