//! Lock file management: load, save (atomic), path derivation.

use super::error::{PlanError, Result};
use super::graph::ResourceGraph;
use super::types::{PlanLock, ResourceLock};
use chrono::{SecondsFormat, Utc};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

pub const LOCK_SCHEMA: &str = "1.0";

/// Derive the lock file path for a stack within the state directory.
pub fn lock_file_path(state_dir: &Path, name: &str) -> PathBuf {
    state_dir.join(name).join("plan.lock.yaml")
}

/// Load a stack's lock file. Returns None if the file doesn't exist.
pub fn load_lock(state_dir: &Path, name: &str) -> Result<Option<PlanLock>> {
    let path = lock_file_path(state_dir, name);
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(&path).map_err(|e| PlanError::io(&path, e))?;
    let lock: PlanLock = serde_yaml_ng::from_str(&content)?;
    Ok(Some(lock))
}

/// Save a lock file atomically (write to temp, then rename).
pub fn save_lock(state_dir: &Path, lock: &PlanLock) -> Result<PathBuf> {
    let path = lock_file_path(state_dir, &lock.name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| PlanError::io(parent, e))?;
    }

    let yaml = serde_yaml_ng::to_string(lock)?;

    let tmp_path = path.with_extension("yaml.tmp");
    std::fs::write(&tmp_path, &yaml).map_err(|e| PlanError::io(&tmp_path, e))?;
    std::fs::rename(&tmp_path, &path).map_err(|e| PlanError::io(&path, e))?;

    tracing::debug!(path = %path.display(), resources = lock.resources.len(), "lock saved");
    Ok(path)
}

/// Snapshot a sealed graph, resources in creation order.
pub fn new_lock(graph: &ResourceGraph) -> Result<PlanLock> {
    let mut resources = IndexMap::new();
    for id in graph.execution_order() {
        let (Some(node), Some(hash)) = (graph.get(id), graph.node_hash(id)?) else {
            continue;
        };
        resources.insert(
            id.clone(),
            ResourceLock {
                resource_type: node.resource.type_name().to_string(),
                hash,
                removal_policy: node.removal_policy,
            },
        );
    }
    Ok(PlanLock {
        schema: LOCK_SCHEMA.to_string(),
        name: graph.name().to_string(),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        generator: format!("tierplan {}", env!("CARGO_PKG_VERSION")),
        fingerprint: graph.fingerprint()?,
        resources,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resource::RemovalPolicy;
    use crate::core::types::StackConfig;
    use crate::topology;

    fn make_lock() -> PlanLock {
        let mut resources = IndexMap::new();
        resources.insert(
            "PreprodLogGroup".to_string(),
            ResourceLock {
                resource_type: "AWS::Logs::LogGroup".to_string(),
                hash: "blake3:abc123".to_string(),
                removal_policy: RemovalPolicy::Destroy,
            },
        );
        PlanLock {
            schema: "1.0".to_string(),
            name: "Preprod".to_string(),
            generated_at: "2026-02-16T14:00:00Z".to_string(),
            generator: "tierplan 0.1.0".to_string(),
            fingerprint: "blake3:fff".to_string(),
            resources,
        }
    }

    #[test]
    fn test_lock_file_path() {
        let p = lock_file_path(Path::new("/state"), "Preprod");
        assert_eq!(p, PathBuf::from("/state/Preprod/plan.lock.yaml"));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let lock = make_lock();
        save_lock(dir.path(), &lock).unwrap();

        let loaded = load_lock(dir.path(), "Preprod").unwrap().unwrap();
        assert_eq!(loaded, lock);
    }

    #[test]
    fn test_load_nonexistent() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_lock(dir.path(), "Ghost").unwrap().is_none());
    }

    #[test]
    fn test_load_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_file_path(dir.path(), "Preprod");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "resources: [unterminated").unwrap();
        assert!(matches!(load_lock(dir.path(), "Preprod"), Err(PlanError::Yaml(_))));
    }

    #[test]
    fn test_atomic_write() {
        let dir = tempfile::tempdir().unwrap();
        let written = save_lock(dir.path(), &make_lock()).unwrap();

        let tmp = dir.path().join("Preprod").join("plan.lock.yaml.tmp");
        assert!(!tmp.exists());
        assert_eq!(written, lock_file_path(dir.path(), "Preprod"));
        assert!(written.exists());
    }

    #[test]
    fn test_new_lock_from_graph() {
        let graph = topology::build(&StackConfig::new(".env")).unwrap();
        let lock = new_lock(&graph).unwrap();
        assert_eq!(lock.name, "Preprod");
        assert_eq!(lock.resources.len(), graph.len());
        assert!(lock.generated_at.ends_with('Z'));
        assert_eq!(lock.fingerprint, graph.fingerprint().unwrap());

        let keys: Vec<&String> = lock.resources.keys().collect();
        let order: Vec<&String> = graph.execution_order().iter().collect();
        assert_eq!(keys, order);
        assert_eq!(
            lock.resources["PreprodDatabase"].removal_policy,
            RemovalPolicy::Snapshot
        );
    }
}
