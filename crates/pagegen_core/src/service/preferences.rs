//! UI convenience preferences.
//!
//! The last template used for generation is an explicit value: generation
//! returns updated preferences and the caller decides when to persist them
//! through a `SettingsStore`.

use crate::model::document::DocumentId;
use crate::repo::document_repo::RepoResult;
use crate::repo::settings_repo::SettingsStore;
use log::warn;
use uuid::Uuid;

/// Settings key holding the last used template id.
pub const SETTING_LAST_TEMPLATE: &str = "pagegen.last_template";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    /// Pre-fills the template chooser of the next generation run.
    pub last_template_id: Option<DocumentId>,
}

impl Preferences {
    /// Loads preferences; unparsable stored values are treated as unset.
    pub fn load(store: &impl SettingsStore) -> RepoResult<Self> {
        let raw = store.get(SETTING_LAST_TEMPLATE, "")?;
        let last_template_id = match raw.trim() {
            "" => None,
            value => match Uuid::parse_str(value) {
                Ok(id) => Some(id),
                Err(_) => {
                    warn!(
                        "event=preferences_load module=service status=error error_code=invalid_template_id"
                    );
                    None
                }
            },
        };
        Ok(Self { last_template_id })
    }

    pub fn save(&self, store: &impl SettingsStore) -> RepoResult<()> {
        let value = self
            .last_template_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        store.set(SETTING_LAST_TEMPLATE, &value)
    }

    pub fn with_last_template(mut self, template_id: DocumentId) -> Self {
        self.last_template_id = Some(template_id);
        self
    }
}
