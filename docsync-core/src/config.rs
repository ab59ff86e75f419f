use tracing::{debug, info};

use crate::page::PageContext;
use crate::reference::Repository;
use crate::validate::ValidationRules;

pub const DEFAULT_DOCS_PREFIX: &str = "docs/";
pub const DEFAULT_CONFIG_PATH: &str = "docs/config.yml";
pub const DEFAULT_BRANCH: &str = "main";

/// Everything a synchronisation run needs besides its collaborators.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub repository: Repository,
    pub author: String,
    /// Content revision (commit sha) of this run, if known.
    pub revision: Option<String>,
    pub branch: String,
    /// Only changed paths under this prefix are processed.
    pub docs_prefix: String,
    /// Repository-relative path of the collection config.
    pub config_path: String,
    /// Space-delimited list of every known document path.
    pub all_files: String,
    /// Space-delimited changed paths. `None` on a manual trigger.
    pub files_changed: Option<String>,
    pub rules: ValidationRules,
}

impl SyncSettings {
    pub fn new(repository: Repository, author: impl Into<String>) -> Self {
        Self {
            repository,
            author: author.into(),
            revision: None,
            branch: DEFAULT_BRANCH.to_string(),
            docs_prefix: DEFAULT_DOCS_PREFIX.to_string(),
            config_path: DEFAULT_CONFIG_PATH.to_string(),
            all_files: String::new(),
            files_changed: None,
            rules: ValidationRules::default(),
        }
    }

    pub fn page_context(&self) -> PageContext {
        PageContext {
            repository: self.repository.clone(),
            author: self.author.clone(),
            revision: self.revision.clone(),
            branch: self.branch.clone(),
            rules: self.rules,
        }
    }

    pub fn trace_loaded(&self) {
        info!(
            repository = %self.repository,
            branch = %self.branch,
            docs_prefix = %self.docs_prefix,
            config_path = %self.config_path,
            manual_trigger = self.files_changed.is_none(),
            require_uuid = self.rules.require_uuid,
            "Loaded sync settings"
        );
        debug!(?self, "Sync settings loaded (full debug)");
    }
}
