//! Management of a user's stored settings of one kind.
//!
//! A [`SettingEditor`] is scoped to one owner and one
//! [`SettingKind`] and carries the name of the currently selected
//! setting across requests. Operations report failure through a
//! stored human-readable message rather than an error, mirroring how
//! the outcome is presented back on the editor page; only genuine
//! database faults surface as errors.

use sqlx::SqlitePool;
use tracing::debug;

use crate::db::settings::{self, SettingRow};
use crate::setting::{Setting, SettingKind, TEMPLATE_OWNER};
use crate::Result;

const MAX_NAME_LENGTH: usize = 64;
const MAX_COPY_SUFFIX: u32 = 10;

pub struct SettingEditor {
    db: SqlitePool,
    owner: String,
    kind: SettingKind,
    selected: Option<String>,
    message: String,
}

impl SettingEditor {
    pub fn new(db: SqlitePool, owner: &str, kind: SettingKind) -> SettingEditor {
        SettingEditor {
            db,
            owner: owner.to_string(),
            kind,
            selected: None,
            message: String::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn kind(&self) -> SettingKind {
        self.kind
    }

    /// Outcome of the last operation, for display on the editor page.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Restore a previously selected name, e.g. from session state.
    pub fn restore_selection(&mut self, name: Option<String>) {
        self.selected = name;
    }

    /// Select a setting by name. An unknown name clears nothing and
    /// reports false.
    pub async fn select(&mut self, name: &str) -> Result<bool> {
        if !settings::exists(&self.db, &self.owner, self.kind, name).await? {
            self.message = format!("The setting {} does not exist.", name);
            return Ok(false);
        }
        self.selected = Some(name.to_string());
        self.message.clear();
        Ok(true)
    }

    /// All settings of this owner and kind, ordered by name.
    pub async fn settings(&self) -> Result<Vec<SettingRow>> {
        settings::list_settings(&self.db, &self.owner, self.kind).await
    }

    /// Template settings published by the administrator.
    pub async fn public_settings(&self) -> Result<Vec<SettingRow>> {
        settings::list_settings(&self.db, TEMPLATE_OWNER, self.kind).await
    }

    /// Load one setting by name.
    pub async fn setting(&self, name: &str) -> Result<Option<Setting>> {
        settings::load_setting(&self.db, &self.owner, self.kind, name).await
    }

    /// Load the selected setting. A selection that no longer resolves
    /// (deleted from another session) is dropped.
    pub async fn load_selected(&mut self) -> Result<Option<Setting>> {
        let Some(name) = self.selected.clone() else {
            return Ok(None);
        };
        let setting = self.setting(&name).await?;
        if setting.is_none() {
            debug!("Selected setting '{}' vanished, clearing selection", name);
            self.selected = None;
        }
        Ok(setting)
    }

    /// Build an empty setting under a new name. The setting is not
    /// stored; it only reaches the database once the wizard validates
    /// it and saves. Name problems report `None` with a message.
    pub async fn create_new_setting(&mut self, name: &str) -> Result<Option<Setting>> {
        let name = name.trim();
        if !self.check_new_setting_name(name) {
            return Ok(None);
        }
        if settings::exists(&self.db, &self.owner, self.kind, name).await? {
            self.message = format!(
                "A setting with the name {} already exists. Please choose another name!",
                name
            );
            return Ok(None);
        }
        let mut setting = Setting::new(self.kind);
        setting.set_name(name);
        setting.set_owner(&self.owner);
        self.message.clear();
        Ok(Some(setting))
    }

    /// Store a copy of the selected setting under a new name and
    /// select the copy.
    pub async fn copy_selected_setting(&mut self, new_name: &str) -> Result<bool> {
        let Some(source) = self.load_selected().await? else {
            self.message = "Please select a setting to copy.".to_string();
            return Ok(false);
        };
        let new_name = new_name.trim();
        if !self.check_new_setting_name(new_name) {
            return Ok(false);
        }
        if settings::exists(&self.db, &self.owner, self.kind, new_name).await? {
            self.message = format!(
                "A setting with the name {} already exists. Please choose another name!",
                new_name
            );
            return Ok(false);
        }
        let mut copy = Setting::new(self.kind);
        copy.set_name(new_name);
        copy.set_owner(&self.owner);
        copy.copy_parameters_from(&source);
        settings::save_setting(&self.db, &copy).await?;
        self.selected = Some(new_name.to_string());
        self.message.clear();
        Ok(true)
    }

    /// Copy an administrator template into this user's settings. When
    /// the name is taken a numeric suffix is appended, giving up after
    /// a few attempts rather than scanning forever.
    pub async fn copy_public_setting(&mut self, name: &str) -> Result<bool> {
        let Some(source) =
            settings::load_setting(&self.db, TEMPLATE_OWNER, self.kind, name).await?
        else {
            self.message = format!("The template {} does not exist.", name);
            return Ok(false);
        };

        let mut target_name = name.to_string();
        let mut suffix = 1;
        while settings::exists(&self.db, &self.owner, self.kind, &target_name).await? {
            if suffix > MAX_COPY_SUFFIX {
                self.message = format!(
                    "Could not find a free name for a copy of the template {}.",
                    name
                );
                return Ok(false);
            }
            target_name = format!("{}_{}", name, suffix);
            suffix += 1;
        }

        let mut copy = Setting::new(self.kind);
        copy.set_name(&target_name);
        copy.set_owner(&self.owner);
        copy.copy_parameters_from(&source);
        settings::save_setting(&self.db, &copy).await?;
        self.selected = Some(target_name);
        self.message.clear();
        Ok(true)
    }

    /// Mark the selected setting as this user's default for the kind,
    /// clearing the flag from every other setting of the kind.
    pub async fn make_selected_setting_default(&mut self) -> Result<bool> {
        let Some(name) = self.selected.clone() else {
            self.message = "Please select a setting to mark as default.".to_string();
            return Ok(false);
        };
        if !settings::set_default(&self.db, &self.owner, self.kind, &name).await? {
            self.message = format!("The setting {} does not exist.", name);
            self.selected = None;
            return Ok(false);
        }
        self.message.clear();
        Ok(true)
    }

    /// Delete the selected setting. With nothing selected this is a
    /// no-op that reports false; storage is never touched.
    pub async fn delete_selected_setting(&mut self) -> Result<bool> {
        let Some(name) = self.selected.clone() else {
            self.message = "Please select a setting to delete.".to_string();
            return Ok(false);
        };
        if !settings::delete_setting(&self.db, &self.owner, self.kind, &name).await? {
            self.message = format!("The setting {} does not exist.", name);
            self.selected = None;
            return Ok(false);
        }
        self.selected = None;
        self.message.clear();
        Ok(true)
    }

    /// Validate a candidate name; failures set the message.
    pub fn check_new_setting_name(&mut self, name: &str) -> bool {
        if name.is_empty() {
            self.message = "The setting name cannot be empty.".to_string();
            return false;
        }
        if name.len() > MAX_NAME_LENGTH {
            self.message = format!(
                "The setting name cannot be longer than {} characters.",
                MAX_NAME_LENGTH
            );
            return false;
        }
        let valid = name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'));
        if !valid {
            self.message = "Please use only letters, numbers, spaces, hyphens, \
                            underscores and periods in setting names."
                .to_string();
            return false;
        }
        true
    }
}
