//! Definition loader: reads type and command definitions from disk
//!
//! Definition files are stored at `<data_dir>/metadata/appdef/*.json`.
//! Files are applied in file-name order; a malformed file aborts loading.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::{AppDefError, AppDefResult};
use super::registry::{AppDef, AppDefBuilder};
use super::types::{CommandDef, TypeDef};

/// Contents of one definition file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionFile {
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub commands: Vec<CommandDef>,
}

/// Loads definition files from a data directory.
pub struct AppDefLoader {
    /// Directory containing definition files
    def_dir: PathBuf,
}

impl AppDefLoader {
    /// Creates a loader for `<data_dir>/metadata/appdef/`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            def_dir: data_dir.join("metadata").join("appdef"),
        }
    }

    /// Returns the definition directory path.
    pub fn def_dir(&self) -> &Path {
        &self.def_dir
    }

    /// Reads every `*.json` file and builds the application definition.
    ///
    /// A missing directory yields an empty definition.
    pub fn load(&self) -> AppDefResult<AppDef> {
        let mut builder = AppDefBuilder::new();

        if !self.def_dir.exists() {
            return builder.build();
        }

        let entries = fs::read_dir(&self.def_dir).map_err(|e| {
            AppDefError::malformed(
                self.def_dir.display().to_string(),
                format!("Failed to read definition directory: {}", e),
            )
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                AppDefError::malformed(
                    self.def_dir.display().to_string(),
                    format!("Failed to read directory entry: {}", e),
                )
            })?;
            let path = entry.path();
            if path.extension().map_or(false, |ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in &paths {
            let file = Self::read_file(path)?;
            debug!(
                path = %path.display(),
                types = file.types.len(),
                commands = file.commands.len(),
                "definition file loaded"
            );
            for def in file.types {
                builder.add_type(def);
            }
            for cmd in file.commands {
                builder.add_command(cmd);
            }
        }

        builder.build()
    }

    fn read_file(path: &Path) -> AppDefResult<DefinitionFile> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppDefError::malformed(path.display().to_string(), format!("Failed to read file: {}", e))
        })?;

        serde_json::from_str(&content).map_err(|e| {
            AppDefError::malformed(path.display().to_string(), format!("Invalid JSON: {}", e))
        })
    }

    /// Writes a definition file named `<name>.json`.
    pub fn save(&self, name: &str, file: &DefinitionFile) -> AppDefResult<PathBuf> {
        let path = self.def_dir.join(format!("{}.json", name));

        fs::create_dir_all(&self.def_dir).map_err(|e| {
            AppDefError::malformed(
                self.def_dir.display().to_string(),
                format!("Failed to create definition directory: {}", e),
            )
        })?;

        let content = serde_json::to_string_pretty(file).map_err(|e| {
            AppDefError::malformed(path.display().to_string(), format!("Failed to serialize: {}", e))
        })?;

        fs::write(&path, content).map_err(|e| {
            AppDefError::malformed(path.display().to_string(), format!("Failed to write file: {}", e))
        })?;

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appdef::errors::AppDefErrorCode;
    use crate::appdef::qname::QName;
    use crate::appdef::types::{DataKind, FieldDef, TypeKind};
    use tempfile::TempDir;

    fn sample_file() -> DefinitionFile {
        DefinitionFile {
            types: vec![
                TypeDef::new(QName::new("test", "Doc"), TypeKind::Document)
                    .with_field(FieldDef::required("name", DataKind::String)),
                TypeDef::new(QName::new("test", "Params"), TypeKind::Object),
            ],
            commands: vec![CommandDef::new(QName::new("test", "Cmd"))
                .with_param(QName::new("test", "Params"))],
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let loader = AppDefLoader::new(temp_dir.path());

        loader.save("main", &sample_file()).unwrap();

        let app = loader.load().unwrap();
        let doc = app.type_def(&QName::new("test", "Doc")).unwrap();
        assert_eq!(doc.field_index("name"), Some(0));
        assert!(app.command(&QName::new("test", "Cmd")).is_some());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let loader = AppDefLoader::new(temp_dir.path());
        let app = loader.load().unwrap();
        assert_eq!(app.type_count(), 0);
    }

    #[test]
    fn test_malformed_file_is_fatal() {
        let temp_dir = TempDir::new().unwrap();
        let loader = AppDefLoader::new(temp_dir.path());
        fs::create_dir_all(loader.def_dir()).unwrap();
        fs::write(loader.def_dir().join("bad.json"), "{ not json").unwrap();

        let err = loader.load().unwrap_err();
        assert_eq!(err.code(), AppDefErrorCode::AeroAppDefMalformed);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_definitions_across_files_are_merged() {
        let temp_dir = TempDir::new().unwrap();
        let loader = AppDefLoader::new(temp_dir.path());

        let mut first = sample_file();
        let second = DefinitionFile {
            types: vec![first.types.pop().unwrap()],
            commands: Vec::new(),
        };
        loader.save("a", &first).unwrap();
        loader.save("b", &second).unwrap();

        let app = loader.load().unwrap();
        assert_eq!(app.type_count(), 2);
    }
}
