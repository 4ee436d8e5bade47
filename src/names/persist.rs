//! Names preparation and persistence
//!
//! Tables are stored at `<data_dir>/metadata/names.json`. Preparation is
//! deterministic: new names are assigned in sorted order.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::appdef::{AppDef, QName};
use crate::ids::RecordId;

use super::errors::{NamesError, NamesResult};
use super::tables::{ContainerTable, QNameTable, SingletonTable};

/// Persisted form of the name tables. Reserved entries are not stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamesFile {
    #[serde(default)]
    pub qnames: BTreeMap<QName, u16>,
    #[serde(default)]
    pub containers: BTreeMap<String, u16>,
    #[serde(default)]
    pub singletons: BTreeMap<QName, u64>,
}

/// Qualified name, container and singleton tables of one application.
#[derive(Debug, Clone, Default)]
pub struct Names {
    qnames: QNameTable,
    containers: ContainerTable,
    singletons: SingletonTable,
}

impl Names {
    /// Assigns identifiers to every name of the application definition.
    pub fn prepare(appdef: &AppDef) -> NamesResult<Self> {
        let mut names = Self::default();
        names.add_missing(appdef)?;
        Ok(names)
    }

    /// Restores tables from their persisted form.
    pub fn from_file(file: NamesFile) -> NamesResult<Self> {
        let mut names = Self::default();
        for (qname, id) in file.qnames {
            names.qnames.restore(qname, id)?;
        }
        for (name, id) in file.containers {
            names.containers.restore(name, id)?;
        }
        for (qname, id) in file.singletons {
            names.singletons.restore(qname, RecordId::new(id))?;
        }
        Ok(names)
    }

    /// Returns the persisted form of the tables.
    pub fn to_file(&self) -> NamesFile {
        NamesFile {
            qnames: self
                .qnames
                .user_entries()
                .map(|(q, id)| (q.clone(), id))
                .collect(),
            containers: self
                .containers
                .user_entries()
                .map(|(c, id)| (c.clone(), id))
                .collect(),
            singletons: self
                .singletons
                .entries()
                .map(|(q, id)| (q.clone(), id.value()))
                .collect(),
        }
    }

    /// Loads `<data_dir>/metadata/names.json`, adds names the application
    /// definition introduced since, and saves the result.
    pub fn load_or_prepare(data_dir: &Path, appdef: &AppDef) -> NamesResult<Self> {
        let path = Self::file_path(data_dir);

        let mut names = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| NamesError::Io {
                path: path.display().to_string(),
                source,
            })?;
            let file: NamesFile =
                serde_json::from_str(&content).map_err(|source| NamesError::Json {
                    path: path.display().to_string(),
                    source,
                })?;
            debug!(path = %path.display(), qnames = file.qnames.len(), "names loaded");
            Self::from_file(file)?
        } else {
            Self::default()
        };

        let added = names.add_missing(appdef)?;
        if added > 0 || !path.exists() {
            names.save(&path)?;
            info!(path = %path.display(), added, "names prepared");
        }
        Ok(names)
    }

    fn file_path(data_dir: &Path) -> PathBuf {
        data_dir.join("metadata").join("names.json")
    }

    fn save(&self, path: &Path) -> NamesResult<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|source| NamesError::Io {
                path: dir.display().to_string(),
                source,
            })?;
        }
        let content =
            serde_json::to_string_pretty(&self.to_file()).map_err(|source| NamesError::Json {
                path: path.display().to_string(),
                source,
            })?;
        fs::write(path, content).map_err(|source| NamesError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    /// Adds every name not yet in the tables. Returns the number added.
    fn add_missing(&mut self, appdef: &AppDef) -> NamesResult<usize> {
        let before = self.qnames.len() + self.containers.len() + self.singletons.len();

        let mut qnames = BTreeSet::new();
        let mut containers = BTreeSet::new();
        let mut singletons = BTreeSet::new();

        for def in appdef.types() {
            qnames.insert(def.qname.clone());
            for cont in &def.containers {
                containers.insert(cont.name.clone());
            }
            if def.singleton {
                singletons.insert(def.qname.clone());
            }
        }
        for cmd in appdef.commands() {
            qnames.insert(cmd.qname.clone());
        }

        for qname in qnames {
            if self.qnames.id(&qname).is_err() {
                self.qnames.add(qname)?;
            }
        }
        for name in containers {
            if self.containers.id(&name).is_err() {
                self.containers.add(name)?;
            }
        }
        for qname in singletons {
            self.singletons.add(qname)?;
        }

        Ok(self.qnames.len() + self.containers.len() + self.singletons.len() - before)
    }

    pub fn qnames(&self) -> &QNameTable {
        &self.qnames
    }

    pub fn containers(&self) -> &ContainerTable {
        &self.containers
    }

    pub fn singletons(&self) -> &SingletonTable {
        &self.singletons
    }
}
