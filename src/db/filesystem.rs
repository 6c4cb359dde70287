//! Narrow filesystem-only catalog used when no database connection string
//! is configured (spec §6, §9). Supports exactly the operations the spec
//! carves out for this mode: add, list, delete, rename, play-by-name.
//! Everything else returns `CoreError::Unsupported`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use color_eyre::Result;
use color_eyre::eyre::Context;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FsBinding {
    pub alias: String,
    pub unique_name: String,
    pub byte_size: u64,
}

#[derive(Default, Serialize, Deserialize)]
struct Index {
    /// identity -> bindings, in insertion order.
    by_identity: HashMap<String, Vec<FsBinding>>,
}

pub struct FilesystemCatalog {
    base_dir: PathBuf,
    index_path: PathBuf,
    index: Mutex<Index>,
}

impl FilesystemCatalog {
    pub fn open(base_dir: PathBuf) -> Result<FilesystemCatalog> {
        std::fs::create_dir_all(&base_dir)
            .wrap_err_with(|| format!("creating asset directory {}", base_dir.display()))?;
        let index_path = base_dir.join(".voxrelay-index.json");
        let index = if index_path.exists() {
            let raw = std::fs::read_to_string(&index_path).wrap_err("reading filesystem index")?;
            serde_json::from_str(&raw).wrap_err("parsing filesystem index")?
        } else {
            Index::default()
        };
        Ok(FilesystemCatalog { base_dir, index_path, index: Mutex::new(index) })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn persist(&self, index: &Index) -> CoreResult<()> {
        let raw = serde_json::to_string_pretty(index)
            .map_err(|e| CoreError::Fatal(format!("serializing filesystem index: {e}")))?;
        std::fs::write(&self.index_path, raw)
            .map_err(|e| CoreError::Transient(format!("writing filesystem index: {e}")))
    }

    pub fn add(&self, identity: &str, alias: &str, unique_name: &str, byte_size: u64) -> CoreResult<()> {
        let mut index = self.index.lock().unwrap();
        let bindings = index.by_identity.entry(identity.to_string()).or_default();
        if bindings.iter().any(|b| b.alias == alias) {
            return Err(CoreError::AlreadyExists(format!("alias {alias} already in use")));
        }
        bindings.push(FsBinding { alias: alias.to_string(), unique_name: unique_name.to_string(), byte_size });
        self.persist(&index)
    }

    pub fn list(&self, identity: &str) -> Vec<FsBinding> {
        self.index.lock().unwrap().by_identity.get(identity).cloned().unwrap_or_default()
    }

    pub fn delete(&self, identity: &str, alias: &str) -> CoreResult<()> {
        let mut index = self.index.lock().unwrap();
        let bindings = index
            .by_identity
            .get_mut(identity)
            .ok_or_else(|| CoreError::NotFound(format!("no binding named {alias}")))?;
        let before = bindings.len();
        bindings.retain(|b| b.alias != alias);
        if bindings.len() == before {
            return Err(CoreError::NotFound(format!("no binding named {alias}")));
        }
        self.persist(&index)
    }

    pub fn rename(&self, identity: &str, old_alias: &str, new_alias: &str) -> CoreResult<()> {
        let mut index = self.index.lock().unwrap();
        if index.by_identity.get(identity).is_some_and(|b| b.iter().any(|b| b.alias == new_alias)) {
            return Err(CoreError::AlreadyExists(format!("alias {new_alias} already in use")));
        }
        let bindings = index
            .by_identity
            .get_mut(identity)
            .ok_or_else(|| CoreError::NotFound(format!("no binding named {old_alias}")))?;
        let binding = bindings
            .iter_mut()
            .find(|b| b.alias == old_alias)
            .ok_or_else(|| CoreError::NotFound(format!("no binding named {old_alias}")))?;
        binding.alias = new_alias.to_string();
        self.persist(&index)
    }

    pub fn find_by_name(&self, identity: &str, name: &str) -> CoreResult<FsBinding> {
        self.index
            .lock()
            .unwrap()
            .by_identity
            .get(identity)
            .and_then(|b| b.iter().find(|b| b.alias.eq_ignore_ascii_case(name)))
            .cloned()
            .ok_or_else(|| CoreError::NotFound(format!("no binding named {name}")))
    }

    pub fn asset_path(&self, binding: &FsBinding) -> PathBuf {
        self.base_dir.join(&binding.unique_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_delete_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let cat = FilesystemCatalog::open(dir.path().to_path_buf()).unwrap();
        cat.add("id1", "laugh", "uniq1.mp3", 1024).unwrap();
        assert_eq!(cat.list("id1").len(), 1);
        cat.delete("id1", "laugh").unwrap();
        assert_eq!(cat.list("id1").len(), 0);
    }

    #[test]
    fn duplicate_alias_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cat = FilesystemCatalog::open(dir.path().to_path_buf()).unwrap();
        cat.add("id1", "laugh", "uniq1.mp3", 1024).unwrap();
        assert!(matches!(cat.add("id1", "laugh", "uniq2.mp3", 1), Err(CoreError::AlreadyExists(_))));
    }
}
