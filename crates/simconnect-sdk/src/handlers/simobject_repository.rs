//! A file-backed catalog of SimObjects to spawn.
//!
//! Entries are keyed by a generated id and can also be found by an
//! optional unique tag or by title. The catalog lives in memory; `save`
//! and `load` write and read it as pretty-printed JSON, by default in
//! `<repository>/simobjects.json`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use simconnect_models::SimObjectType;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::HostResult;

const TARGET: &str = "simconnect::repository";

/// Name of the catalog file inside the repository directory.
pub const REPOSITORY_FILE: &str = "simobjects.json";

fn default_object_type() -> SimObjectType {
    SimObjectType::Aircraft
}

/// One catalog entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SimObjectInfo {
    /// Unique id. Left empty, [`SimObjectRepository::set`] generates one.
    #[serde(default)]
    pub id: String,
    /// Optional unique tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Object kind.
    #[serde(rename = "type", default = "default_object_type")]
    pub object_type: SimObjectType,
    /// Container title, as used to spawn the object.
    pub title: String,
    /// Livery, for hosts that separate it from the title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub livery: Option<String>,
}

impl SimObjectInfo {
    /// An aircraft entry with no id, tag or livery.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            tag: None,
            object_type: SimObjectType::Aircraft,
            title: title.into(),
            livery: None,
        }
    }

    /// Set the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Set the object kind.
    #[must_use]
    pub fn with_type(mut self, object_type: SimObjectType) -> Self {
        self.object_type = object_type;
        self
    }

    /// Set the livery.
    #[must_use]
    pub fn with_livery(mut self, livery: impl Into<String>) -> Self {
        self.livery = Some(livery.into());
        self
    }
}

/// In-memory catalog with id, tag and title indexes.
#[derive(Debug, Clone)]
pub struct SimObjectRepository {
    path: PathBuf,
    objects: BTreeMap<String, SimObjectInfo>,
    tags: HashMap<String, String>,
    titles: BTreeMap<String, BTreeSet<String>>,
}

impl SimObjectRepository {
    /// An empty catalog stored under the directory `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            objects: BTreeMap::new(),
            tags: HashMap::new(),
            titles: BTreeMap::new(),
        }
    }

    /// Repository directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Default catalog file.
    pub fn file(&self) -> PathBuf {
        self.path.join(REPOSITORY_FILE)
    }

    fn unindex(&mut self, id: &str) {
        let Some(old) = self.objects.get(id) else {
            return;
        };
        if let Some(tag) = &old.tag {
            self.tags.remove(tag);
        }
        if let Some(ids) = self.titles.get_mut(&old.title) {
            ids.remove(id);
            if ids.is_empty() {
                self.titles.remove(&old.title);
            }
        }
    }

    /// Add `info`, or replace the entry with the same id, and return the
    /// id. A tag already held by another entry moves to this one.
    pub fn set(&mut self, mut info: SimObjectInfo) -> String {
        if info.id.is_empty() {
            info.id = Uuid::new_v4().to_string();
        }
        let id = info.id.clone();
        self.unindex(&id);

        if let Some(tag) = &info.tag {
            if let Some(previous) = self.tags.insert(tag.clone(), id.clone()) {
                if let Some(holder) = self.objects.get_mut(&previous) {
                    debug!(target: TARGET, tag = %tag, from = %previous, to = %id, "tag moved");
                    holder.tag = None;
                }
            }
        }
        self.titles.entry(info.title.clone()).or_default().insert(id.clone());
        self.objects.insert(id.clone(), info);
        id
    }

    /// Remove the entry `id`.
    pub fn remove(&mut self, id: &str) -> Option<SimObjectInfo> {
        self.unindex(id);
        self.objects.remove(id)
    }

    /// Entry by id.
    pub fn get(&self, id: &str) -> Option<&SimObjectInfo> {
        self.objects.get(id)
    }

    /// Entry by tag.
    pub fn by_tag(&self, tag: &str) -> Option<&SimObjectInfo> {
        self.tags.get(tag).and_then(|id| self.objects.get(id))
    }

    /// Ids of every entry with `title`.
    pub fn ids_by_title(&self, title: &str) -> BTreeSet<String> {
        self.titles.get(title).cloned().unwrap_or_default()
    }

    pub fn contains_id(&self, id: &str) -> bool {
        self.objects.contains_key(id)
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = &SimObjectInfo> {
        self.objects.values()
    }

    /// Replace the catalog with the contents of the default file.
    ///
    /// # Errors
    ///
    /// [`SdkError::Io`](crate::SdkError::Io) when the file cannot be read
    /// (`NotFound` when it does not exist), and
    /// [`SdkError::Json`](crate::SdkError::Json) when it does not parse.
    pub fn load(&mut self) -> HostResult<usize> {
        let file = self.file();
        self.load_from(&file)
    }

    /// Replace the catalog with the contents of `file`. On error the
    /// catalog is left unchanged.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load).
    pub fn load_from(&mut self, file: &Path) -> HostResult<usize> {
        let content = fs::read_to_string(file)?;
        let entries: Vec<SimObjectInfo> = serde_json::from_str(&content)?;
        self.objects.clear();
        self.tags.clear();
        self.titles.clear();
        for entry in entries {
            self.set(entry);
        }
        info!(target: TARGET, path = %file.display(), count = self.len(), "loaded SimObject repository");
        Ok(self.len())
    }

    /// Write the catalog to the default file, creating the directory.
    ///
    /// # Errors
    ///
    /// [`SdkError::Io`](crate::SdkError::Io) when the directory or file
    /// cannot be written.
    pub fn save(&self) -> HostResult<()> {
        self.save_to(&self.file())
    }

    /// Write the catalog to `file`, creating its directory.
    ///
    /// # Errors
    ///
    /// As [`save`](Self::save).
    pub fn save_to(&self, file: &Path) -> HostResult<()> {
        if let Some(parent) = file.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let entries: Vec<&SimObjectInfo> = self.objects.values().collect();
        let json = serde_json::to_string_pretty(&entries)?;
        fs::write(file, json)?;
        info!(target: TARGET, path = %file.display(), count = self.len(), "saved SimObject repository");
        Ok(())
    }
}
