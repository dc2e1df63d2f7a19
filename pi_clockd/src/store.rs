//! The alarms document: one JSON file holding the alarm list and settings.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    alarm::{Alarm, AlarmEdit},
    error::{Error, Result},
    settings::{Settings, SettingsEdit},
};

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct AlarmDocument {
    #[serde(default)]
    pub alarms: Vec<Alarm>,
    #[serde(flatten)]
    pub settings: Settings,
}

/// In-memory copy of the alarms document, written back on every change.
#[derive(Debug)]
pub struct AlarmStore {
    path: PathBuf,
    document: AlarmDocument,
}

impl AlarmStore {
    /// Opens the document at `path`.
    ///
    /// A missing file is created with the default document. An unreadable or
    /// malformed file is logged and replaced in memory by the default document;
    /// the file itself is only overwritten by the next change.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let document = if path.exists() {
            Self::load(&path).unwrap_or_else(|e| {
                warn!("couldn't load alarms, starting with no alarms: {e}");
                AlarmDocument::default()
            })
        } else {
            info!("no alarms file at {}, creating one", path.display());
            let document = AlarmDocument::default();
            if let Err(e) = write_document(&path, &document) {
                warn!("couldn't create alarms file: {e}");
            }
            document
        };
        Self { path, document }
    }

    /// Reads and parses the document, failing on any error.
    pub fn load(path: &Path) -> Result<AlarmDocument> {
        let content = fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn save(&self) -> Result<()> {
        write_document(&self.path, &self.document)
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn document(&self) -> &AlarmDocument {
        &self.document
    }

    #[must_use]
    pub fn alarms(&self) -> &[Alarm] {
        &self.document.alarms
    }

    #[must_use]
    pub const fn settings(&self) -> &Settings {
        &self.document.settings
    }

    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&Alarm> {
        self.document.alarms.iter().find(|alarm| alarm.id == id)
    }

    pub fn add(&mut self, alarm: Alarm) -> Result<Alarm> {
        let mut document = self.document.clone();
        document.alarms.push(alarm.clone());
        self.commit(document)?;
        Ok(alarm)
    }

    pub fn edit(&mut self, id: Uuid, edits: impl IntoIterator<Item = AlarmEdit>) -> Result<Alarm> {
        let mut document = self.document.clone();
        let alarm = document
            .alarms
            .iter_mut()
            .find(|alarm| alarm.id == id)
            .ok_or(Error::AlarmNotFound(id))?;
        for edit in edits {
            *alarm += edit;
        }
        let edited = alarm.clone();
        self.commit(document)?;
        Ok(edited)
    }

    pub fn remove(&mut self, id: Uuid) -> Result<Alarm> {
        let mut document = self.document.clone();
        let index = document
            .alarms
            .iter()
            .position(|alarm| alarm.id == id)
            .ok_or(Error::AlarmNotFound(id))?;
        let removed = document.alarms.remove(index);
        self.commit(document)?;
        Ok(removed)
    }

    pub fn update_settings(
        &mut self,
        edits: impl IntoIterator<Item = SettingsEdit>,
    ) -> Result<Settings> {
        let mut document = self.document.clone();
        for edit in edits {
            document.settings += edit;
        }
        let settings = document.settings.clone();
        self.commit(document)?;
        Ok(settings)
    }

    /// Writes `document` and only then makes it current, so a failed write
    /// leaves memory and disk in agreement.
    fn commit(&mut self, document: AlarmDocument) -> Result<()> {
        write_document(&self.path, &document)?;
        self.document = document;
        Ok(())
    }
}

/// Writes to a sibling temp file and renames it over `path`.
fn write_document(path: &Path, document: &AlarmDocument) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::file(parent, e))?;
    }
    let content = serde_json::to_string_pretty(document)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    fs::write(&tmp, content).map_err(|e| Error::file(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::file(path, e))
}
