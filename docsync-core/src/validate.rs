//! Front-matter validation. Pure: never touches the network.

use std::sync::LazyLock;

use regex::Regex;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::front_matter::FrontMatter;

pub const REQUIRED_FIELDS: [&str; 3] = ["slug", "title", "lang"];

static DISALLOWED_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9-]").expect("static slug pattern compiles"));

/// Optional rules layered on top of the required-field checks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationRules {
    /// Every page must carry a uuid, either in its front matter or on the remote record.
    /// Disabled by default.
    pub require_uuid: bool,
}

/// Checks required fields and field formats.
///
/// Reports every missing required field at once rather than the first one found.
pub fn validate_front_matter(front_matter: &FrontMatter) -> Result<(), ValidationError> {
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| front_matter.non_empty(field).is_none())
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ValidationError::MissingFields(missing));
    }

    if let Some(slug) = front_matter.get("slug") {
        validate_slug(slug)?;
    }

    if let Some(order) = front_matter.non_empty("order") {
        parse_order(order)?;
    }

    if let Some(uuid) = front_matter.non_empty("uuid") {
        if Uuid::parse_str(uuid).is_err() {
            return Err(ValidationError::InvalidUuid(uuid.to_string()));
        }
    }

    Ok(())
}

/// A slug may only contain ASCII letters, ASCII digits and hyphens.
///
/// Non-ASCII letters such as `é` are rejected.
pub fn validate_slug(slug: &str) -> Result<(), ValidationError> {
    if slug.is_empty() || DISALLOWED_SLUG_CHARS.is_match(slug) {
        return Err(ValidationError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

pub fn parse_order(raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidOrder(raw.to_string()))
}

/// The require-uuid rule: with it enabled, a page with no uuid on either side is rejected.
pub fn check_uuid_required(
    rules: &ValidationRules,
    local: Option<&str>,
    remote: Option<&str>,
) -> Result<(), ValidationError> {
    if rules.require_uuid && local.is_none() && remote.is_none() {
        return Err(ValidationError::MissingUuid);
    }
    Ok(())
}
