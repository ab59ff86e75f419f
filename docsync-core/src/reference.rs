//! Deterministic CMS entry identifiers.
//!
//! The reference id is the only notion of identity across runs: it is used both to
//! look a record up and to create it.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Content type of a CMS entry produced by this tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryType {
    Page,
    Collection,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Page => "page",
            EntryType::Collection => "collection",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "page" => Ok(EntryType::Page),
            "collection" => Ok(EntryType::Collection),
            other => Err(format!("unknown entry type `{other}`")),
        }
    }
}

/// A source repository in `org/repo` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repository {
    org: String,
    name: String,
}

impl Repository {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();
        match raw.split_once('/') {
            Some((org, name)) if !org.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self {
                    org: org.to_string(),
                    name: name.to_string(),
                })
            }
            _ => Err(ConfigError::InvalidRepository(raw.to_string())),
        }
    }

    pub fn org(&self) -> &str {
        &self.org
    }

    /// Repository name without the org. Also the provenance tag id.
    pub fn short_name(&self) -> &str {
        &self.name
    }

    /// Link to a file of this repository on GitHub.
    pub fn source_url(&self, branch: &str, path: &str) -> String {
        format!("https://github.com/{self}/blob/{branch}/{path}")
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.name)
    }
}

/// `{org}_{repo}_{entryType}_{key}` with every `/` replaced by `_`.
///
/// Distinct inputs give distinct ids only while the org name contains no `_`, which holds for
/// GitHub organisations: `acme_x/docs` and `acme/x_docs` would collide.
pub fn reference_id(repository: &Repository, entry_type: EntryType, key: &str) -> String {
    format!("{repository}_{entry_type}_{key}").replace('/', "_")
}
