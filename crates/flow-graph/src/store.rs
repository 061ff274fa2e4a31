//! Configuration persistence
//!
//! The editor never owns configuration files; it reads and writes them
//! through a [`ConfigStore`]. Saving an adapter fetches the containing
//! document, splices the new fragment over the old span and writes the
//! document back, so unrelated adapters and comments survive every save.

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use log::info;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;

use frank_doc::SchemaIndex;

use crate::error::{GraphError, Result, TransportError};
use crate::model::GraphModel;
use crate::xml;

/// Result type for store boundary operations
pub type StoreResult<T> = std::result::Result<T, TransportError>;

/// Contents of a configuration file that holds no adapters yet
pub const EMPTY_CONFIGURATION: &str = "<Configuration>\n</Configuration>\n";

/// A project and the configuration files it holds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredProject {
    pub name: String,
    /// Where the project lives, as the store addresses it
    pub root_path: String,
    pub configurations: Vec<StoredConfiguration>,
}

/// One configuration file within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredConfiguration {
    /// Path of the file relative to the project root
    pub filepath: String,
}

/// Everything needed to write one adapter back into its configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveAdapter {
    pub adapter_name: String,
    pub configuration_path: String,
    pub adapter_xml: String,
}

/// Boundary to wherever configuration files live
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Full text of one configuration file.
    async fn fetch_configuration(&self, project: &str, filepath: &str) -> StoreResult<String>;

    /// Overwrite one configuration file.
    async fn save_configuration(
        &self,
        project: &str,
        filepath: &str,
        content: &str,
    ) -> StoreResult<()>;

    /// Create an empty configuration file and return the updated project.
    async fn create_configuration(&self, project: &str, file_name: &str)
        -> StoreResult<StoredProject>;

    /// Write one adapter into its configuration file.
    ///
    /// Replaces the adapter's existing fragment, or appends the fragment
    /// when the configuration has no adapter of that name yet. Every byte
    /// outside the fragment is preserved.
    async fn save_adapter(&self, project: &str, save: SaveAdapter) -> StoreResult<()> {
        let document = self
            .fetch_configuration(project, &save.configuration_path)
            .await?;
        let updated = splice_adapter(&document, &save.adapter_name, &save.adapter_xml)?;
        self.save_configuration(project, &save.configuration_path, &updated)
            .await
    }
}

fn splice_adapter(document: &str, adapter_name: &str, fragment: &str) -> StoreResult<String> {
    match xml::replace_adapter(document, adapter_name, fragment) {
        Ok(updated) => Ok(updated),
        Err(GraphError::AdapterNotFound(_)) => xml::insert_adapter(document, fragment)
            .map_err(|e| TransportError::new(422, e.to_string())),
        Err(e) => Err(TransportError::new(422, e.to_string())),
    }
}

/// Load one adapter out of a configuration into an editable graph.
pub async fn load_adapter(
    store: &dyn ConfigStore,
    schema: &SchemaIndex,
    project: &str,
    filepath: &str,
    adapter_name: &str,
) -> Result<GraphModel> {
    let document = store.fetch_configuration(project, filepath).await?;
    let fragment = xml::extract_adapter(&document, adapter_name)?
        .ok_or_else(|| GraphError::AdapterNotFound(adapter_name.to_string()))?;
    let mut model = xml::parse_adapter(&fragment, schema)?;
    model.set_path(filepath);
    info!("loaded adapter '{adapter_name}' from {filepath}");
    Ok(model)
}

/// Serialize a graph and write it back through the store.
pub async fn save_adapter_to_store(
    store: &dyn ConfigStore,
    schema: &SchemaIndex,
    project: &str,
    model: &GraphModel,
) -> Result<()> {
    let graph = model.graph();
    let adapter_xml = xml::serialize_adapter(graph, schema)?;
    store
        .save_adapter(
            project,
            SaveAdapter {
                adapter_name: graph.name.clone(),
                configuration_path: graph.path.clone(),
                adapter_xml,
            },
        )
        .await?;
    info!("saved adapter '{}' to {}", graph.name, graph.path);
    Ok(())
}

/// In-memory store for tests and previews
#[derive(Default)]
pub struct MemoryConfigStore {
    files: Mutex<HashMap<(String, String), String>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a configuration file.
    pub async fn put(&self, project: &str, filepath: &str, content: &str) {
        self.files
            .lock()
            .await
            .insert(key(project, filepath), content.to_string());
    }

    /// Current contents of a configuration file, if present.
    pub async fn get(&self, project: &str, filepath: &str) -> Option<String> {
        self.files.lock().await.get(&key(project, filepath)).cloned()
    }
}

fn key(project: &str, filepath: &str) -> (String, String) {
    (project.to_string(), filepath.to_string())
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn fetch_configuration(&self, project: &str, filepath: &str) -> StoreResult<String> {
        self.files
            .lock()
            .await
            .get(&key(project, filepath))
            .cloned()
            .ok_or_else(|| not_found(project, filepath))
    }

    async fn save_configuration(
        &self,
        project: &str,
        filepath: &str,
        content: &str,
    ) -> StoreResult<()> {
        self.files
            .lock()
            .await
            .insert(key(project, filepath), content.to_string());
        Ok(())
    }

    async fn create_configuration(
        &self,
        project: &str,
        file_name: &str,
    ) -> StoreResult<StoredProject> {
        let mut files = self.files.lock().await;
        let file_key = key(project, file_name);
        if files.contains_key(&file_key) {
            return Err(already_exists(file_name));
        }
        files.insert(file_key, EMPTY_CONFIGURATION.to_string());

        let mut configurations: Vec<StoredConfiguration> = files
            .keys()
            .filter(|(p, _)| p == project)
            .map(|(_, filepath)| StoredConfiguration {
                filepath: filepath.clone(),
            })
            .collect();
        configurations.sort_by(|a, b| a.filepath.cmp(&b.filepath));
        Ok(StoredProject {
            name: project.to_string(),
            root_path: format!("memory://{project}"),
            configurations,
        })
    }
}

/// Store reading and writing configuration files under a directory, one
/// subdirectory per project
pub struct DirConfigStore {
    root: PathBuf,
}

impl DirConfigStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, project: &str, filepath: &str) -> PathBuf {
        self.root.join(project).join(filepath)
    }

    /// The project's `.xml` configuration files, sorted by file name.
    pub async fn project(&self, name: &str) -> StoreResult<StoredProject> {
        let dir = self.root.join(name);
        let mut entries = fs::read_dir(&dir).await.map_err(|e| io_failure(&e))?;
        let mut configurations = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_failure(&e))? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("xml") {
                continue;
            }
            if let Some(file_name) = path.file_name().and_then(|n| n.to_str()) {
                configurations.push(StoredConfiguration {
                    filepath: file_name.to_string(),
                });
            }
        }
        configurations.sort_by(|a, b| a.filepath.cmp(&b.filepath));
        Ok(StoredProject {
            name: name.to_string(),
            root_path: dir.to_string_lossy().into_owned(),
            configurations,
        })
    }
}

#[async_trait]
impl ConfigStore for DirConfigStore {
    async fn fetch_configuration(&self, project: &str, filepath: &str) -> StoreResult<String> {
        fs::read_to_string(self.file_path(project, filepath))
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    not_found(project, filepath)
                } else {
                    io_failure(&e)
                }
            })
    }

    async fn save_configuration(
        &self,
        project: &str,
        filepath: &str,
        content: &str,
    ) -> StoreResult<()> {
        let path = self.file_path(project, filepath);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| io_failure(&e))?;
        }
        fs::write(&path, content).await.map_err(|e| io_failure(&e))
    }

    async fn create_configuration(
        &self,
        project: &str,
        file_name: &str,
    ) -> StoreResult<StoredProject> {
        let dir = self.root.join(project);
        fs::create_dir_all(&dir).await.map_err(|e| io_failure(&e))?;
        let path = dir.join(file_name);
        if fs::try_exists(&path).await.map_err(|e| io_failure(&e))? {
            return Err(already_exists(file_name));
        }
        fs::write(&path, EMPTY_CONFIGURATION)
            .await
            .map_err(|e| io_failure(&e))?;
        self.project(project).await
    }
}

fn not_found(project: &str, filepath: &str) -> TransportError {
    TransportError::new(
        404,
        format!("configuration '{filepath}' not found in project '{project}'"),
    )
}

fn already_exists(file_name: &str) -> TransportError {
    TransportError::new(409, format!("configuration '{file_name}' already exists"))
        .with_code("configuration-exists")
}

fn io_failure(error: &io::Error) -> TransportError {
    TransportError::new(500, error.to_string())
}
