/// `load_config` module: builds the run settings from CI environment variables and CLI flags.
///
/// This is the only place where process environment is read for a sync run.
///
/// # Environment
/// - `REPOSITORY` (required): `org/repo` the documentation comes from
/// - `AUTHOR` (required): written to every page's author list
/// - `ALL_FILES`: space-delimited list of every documentation path
/// - `FILES_CHANGED`: space-delimited changed paths; absent or empty on a manual trigger
/// - `GITHUB_SHA`: content revision written to each page's `sha` field
///
/// CMS connection variables are read by [`crate::contentful::ContentfulClient::new_from_env`].
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use docsync_core::config::SyncSettings;
use docsync_core::reference::Repository;
use docsync_core::validate::ValidationRules;
use std::env;
use tracing::{error, info, warn};

use crate::cli::SyncArgs;

/// Reads a variable that must be present and non-empty.
pub(crate) fn required_env(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            info!(var = name, "Found in env");
            Ok(value)
        }
        Ok(_) => {
            error!(var = name, "Environment variable is empty");
            Err(anyhow::anyhow!("{name} environment variable is empty"))
        }
        Err(e) => {
            error!(error = ?e, var = name, "Environment variable not set");
            Err(anyhow::anyhow!("{name} environment variable not set: {e}"))
        }
    }
}

/// Reads a variable, treating an empty value as absent.
pub(crate) fn optional_env(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

pub fn load_repository() -> Result<Repository> {
    let raw = required_env("REPOSITORY")?;
    Repository::parse(&raw).map_err(|e| {
        error!(error = %e, repository = %raw, "REPOSITORY is malformed");
        anyhow::Error::new(e)
    })
}

/// Merges environment and CLI flags into the settings for one sync run.
pub fn load_settings(args: &SyncArgs) -> Result<SyncSettings> {
    let repository = load_repository()?;
    let author = required_env("AUTHOR")?;

    let all_files = optional_env("ALL_FILES").unwrap_or_else(|| {
        warn!("ALL_FILES not set; a manual trigger will process no documents");
        String::new()
    });
    let files_changed = optional_env("FILES_CHANGED");
    let revision = optional_env("GITHUB_SHA");

    let settings = SyncSettings {
        repository,
        author,
        revision,
        branch: args.branch.clone(),
        docs_prefix: args.docs_prefix.clone(),
        config_path: args.config.clone(),
        all_files,
        files_changed,
        rules: ValidationRules {
            require_uuid: args.require_uuid,
        },
    };

    info!(
        repository = %settings.repository,
        manual_trigger = settings.files_changed.is_none(),
        "Settings loaded from environment"
    );
    Ok(settings)
}
