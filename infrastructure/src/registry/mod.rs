//! File-backed model registry.
//!
//! The registry file is TOML with a `supported_models` array of descriptors.
//! The current generation lives behind an `RwLock<Arc<Vec<_>>>`: readers take
//! a cheap `Arc` clone, so a snapshot is always internally coherent and a
//! reload mid-task never affects an in-flight runner.
//!
//! [`FileModelRegistry::watch`] registers a `notify` watcher on the file's
//! directory and reloads on write/create events; a reload that fails to
//! parse keeps the previous generation.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, RwLock};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tokiame_application::ModelCatalog;
use tokiame_domain::{ModelDescriptor, ModelStatus};

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("failed to read registry file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse registry file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize registry: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("model with id '{0}' already exists")]
    DuplicateModel(String),

    #[error("model with id '{0}' not found")]
    UnknownModel(String),

    #[error("failed to watch registry file: {0}")]
    Watch(#[from] notify::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    supported_models: Vec<ModelDescriptor>,
}

pub struct FileModelRegistry {
    path: PathBuf,
    models: RwLock<Arc<Vec<ModelDescriptor>>>,
    /// Keeps the filesystem watcher alive for the registry's lifetime.
    watcher: Mutex<Option<RecommendedWatcher>>,
}

impl FileModelRegistry {
    /// Loads the registry from `path`. A missing or malformed file is fatal
    /// at startup.
    pub fn load(path: impl AsRef<Path>) -> Result<Arc<Self>> {
        let path = path.as_ref().to_path_buf();
        let models = read_file(&path)?;
        info!(path = %path.display(), models = models.len(), "model registry loaded");

        Ok(Arc::new(Self {
            path,
            models: RwLock::new(Arc::new(models)),
            watcher: Mutex::new(None),
        }))
    }

    /// Re-reads the file, swapping in the new generation. On failure the
    /// previous generation stays current.
    pub fn reload(&self) -> Result<()> {
        let models = read_file(&self.path)?;
        info!(models = models.len(), "model registry reloaded");
        *self.models.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(models);
        Ok(())
    }

    /// Starts watching the registry file for writes, reloading on change.
    pub fn watch(self: &Arc<Self>) -> Result<()> {
        let file_name = self.path.file_name().map(|n| n.to_os_string());
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(
            move |event: std::result::Result<notify::Event, notify::Error>| {
                let Ok(event) = event else { return };
                if !(event.kind.is_modify() || event.kind.is_create()) {
                    return;
                }
                let ours = event
                    .paths
                    .iter()
                    .any(|p| p.file_name().map(|n| n.to_os_string()) == file_name);
                if ours {
                    let _ = tx.send(());
                }
            },
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;
        info!(dir = %dir.display(), "watching registry file for changes");

        let registry = Arc::clone(self);
        tokio::spawn(async move {
            while rx.recv().await.is_some() {
                if let Err(e) = registry.reload() {
                    warn!("registry reload failed, keeping previous configuration: {e}");
                }
            }
        });

        *self.watcher.lock().unwrap_or_else(|e| e.into_inner()) = Some(watcher);
        Ok(())
    }

    /// Writes the current generation back to the registry file.
    pub fn save(&self) -> Result<()> {
        let models = self.current();
        let content = toml::to_string_pretty(&RegistryFile {
            supported_models: models.as_ref().clone(),
        })?;
        std::fs::write(&self.path, content).map_err(|source| RegistryError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), "model registry saved");
        Ok(())
    }

    /// Adds a model and persists the registry. Ids are unique.
    pub fn add_model(&self, model: ModelDescriptor) -> Result<()> {
        {
            let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
            if models.iter().any(|m| m.id == model.id) {
                return Err(RegistryError::DuplicateModel(model.id));
            }
            let mut next = models.as_ref().clone();
            next.push(model);
            *models = Arc::new(next);
        }
        self.save()
    }

    /// Removes a model by id and persists the registry.
    pub fn remove_model(&self, id: &str) -> Result<()> {
        {
            let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
            if !models.iter().any(|m| m.id == id) {
                return Err(RegistryError::UnknownModel(id.to_string()));
            }
            let next: Vec<_> = models.iter().filter(|m| m.id != id).cloned().collect();
            *models = Arc::new(next);
        }
        self.save()
    }

    /// Updates one model's status and load factor, then persists.
    pub fn set_model_status(&self, id: &str, status: ModelStatus, load_factor: i32) -> Result<()> {
        {
            let mut models = self.models.write().unwrap_or_else(|e| e.into_inner());
            let mut next = models.as_ref().clone();
            let Some(model) = next.iter_mut().find(|m| m.id == id) else {
                return Err(RegistryError::UnknownModel(id.to_string()));
            };
            model.status = status;
            model.current_load_factor = load_factor;
            *models = Arc::new(next);
        }
        self.save()
    }

    fn current(&self) -> Arc<Vec<ModelDescriptor>> {
        Arc::clone(&self.models.read().unwrap_or_else(|e| e.into_inner()))
    }
}

impl ModelCatalog for FileModelRegistry {
    fn snapshot(&self) -> Vec<ModelDescriptor> {
        self.current().as_ref().clone()
    }
}

fn read_file(path: &Path) -> Result<Vec<ModelDescriptor>> {
    let content = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file: RegistryFile = toml::from_str(&content).map_err(|source| RegistryError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.supported_models)
}
