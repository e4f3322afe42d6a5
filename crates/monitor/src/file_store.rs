//! JSON-file backed alert store and owner directory.
//!
//! One document at `{DATA_DIR}/hivewatch.json` holds `users`, `hives` and
//! `alerts`. Every `list_all` and every write re-reads it from disk, so
//! changes made to the file between monitor writes are picked up. Writes
//! go to a sibling temp file that is renamed into place.
//!
//! The file takes no lock. A write is read-modify-write, and an edit that
//! lands between that read and the rename is lost. Run one writer at a
//! time: stop the monitor before editing the file by hand, or use a
//! database-backed [`AlertStore`] when other services change alerts.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};

use hivewatch_core::{Alert, HiveId, Owner, UserId};

use crate::owners::OwnerDirectory;
use crate::store::{AlertStore, StoreError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub notifications_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HiveRecord {
    pub id: HiveId,
    #[serde(default)]
    pub name: String,
    pub user_id: UserId,
}

/// On-disk document layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct HiveDocument {
    #[serde(default)]
    pub users: Vec<UserRecord>,
    #[serde(default)]
    pub hives: Vec<HiveRecord>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
}

impl HiveDocument {
    fn owner_of_hive(&self, hive_id: &str) -> Option<Owner> {
        let hive = self.hives.iter().find(|h| h.id == hive_id)?;
        let user = self.users.iter().find(|u| u.id == hive.user_id)?;
        Some(Owner {
            user_id: user.id.clone(),
            email: user.email.clone(),
            notifications_enabled: user.notifications_enabled,
        })
    }
}

#[derive(Debug)]
pub struct JsonFileAlertStore {
    path: PathBuf,
    /// Last document read from disk. The write lock also serializes writers.
    cache: RwLock<HiveDocument>,
}

impl JsonFileAlertStore {
    /// Open the document at `path`. A missing file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = read_document(&path).await?;
        info!(
            path = %path.display(),
            users = doc.users.len(),
            hives = doc.hives.len(),
            alerts = doc.alerts.len(),
            "alert store opened"
        );
        Ok(Self {
            path,
            cache: RwLock::new(doc),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the whole document on disk (used for seeding).
    pub async fn save(&self, doc: HiveDocument) -> Result<(), StoreError> {
        let mut cache = self.cache.write().await;
        write_document(&self.path, &doc).await?;
        *cache = doc;
        Ok(())
    }

    async fn refresh(&self) -> Result<HiveDocument, StoreError> {
        let doc = read_document(&self.path).await?;
        *self.cache.write().await = doc.clone();
        Ok(doc)
    }
}

#[async_trait]
impl AlertStore for JsonFileAlertStore {
    async fn list_all(&self) -> Result<Vec<Alert>, StoreError> {
        let mut alerts = self.refresh().await?.alerts;
        alerts.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(alerts)
    }

    async fn get(&self, alert_id: &str) -> Result<Option<Alert>, StoreError> {
        let doc = read_document(&self.path).await?;
        Ok(doc.alerts.into_iter().find(|a| a.id == alert_id))
    }

    async fn update_trigger_state(
        &self,
        alert_id: &str,
        expected_previous: bool,
        new_state: bool,
    ) -> Result<bool, StoreError> {
        let mut cache = self.cache.write().await;
        let mut doc = read_document(&self.path).await?;

        let alert = doc
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| StoreError::NotFound(alert_id.to_string()))?;
        if alert.is_triggered != expected_previous {
            debug!(alert_id, expected_previous, "trigger state changed underneath us");
            *cache = doc;
            return Ok(false);
        }
        alert.is_triggered = new_state;

        write_document(&self.path, &doc).await?;
        *cache = doc;
        Ok(true)
    }
}

#[async_trait]
impl OwnerDirectory for JsonFileAlertStore {
    async fn owner_of_hive(&self, hive_id: &str) -> Result<Option<Owner>, StoreError> {
        Ok(self.cache.read().await.owner_of_hive(hive_id))
    }

    async fn hives_of_user(&self, user_id: &str) -> Result<Vec<HiveId>, StoreError> {
        Ok(self
            .cache
            .read()
            .await
            .hives
            .iter()
            .filter(|h| h.user_id == user_id)
            .map(|h| h.id.clone())
            .collect())
    }
}

async fn read_document(path: &Path) -> Result<HiveDocument, StoreError> {
    match tokio::fs::read(path).await {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(HiveDocument::default()),
        Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HiveDocument::default()),
        Err(e) => Err(e.into()),
    }
}

async fn write_document(path: &Path, doc: &HiveDocument) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_vec_pretty(doc)?;
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document() -> HiveDocument {
        HiveDocument {
            users: vec![
                UserRecord {
                    id: "u1".into(),
                    email: "keeper@example.com".into(),
                    notifications_enabled: true,
                },
                UserRecord {
                    id: "u2".into(),
                    email: "quiet@example.com".into(),
                    notifications_enabled: false,
                },
            ],
            hives: vec![
                HiveRecord { id: "h1".into(), name: "North".into(), user_id: "u1".into() },
                HiveRecord { id: "h2".into(), name: "South".into(), user_id: "u1".into() },
                HiveRecord { id: "h3".into(), name: "Roof".into(), user_id: "u2".into() },
            ],
            alerts: vec![
                Alert::new("a2", "h2", "Heavy", "[]"),
                Alert::new("a1", "h1", "Hot", r#"[{"parameter":"temperature","operator":">","threshold":30}]"#),
            ],
        }
    }

    async fn seeded(dir: &tempfile::TempDir) -> JsonFileAlertStore {
        let store = JsonFileAlertStore::open(dir.path().join("hivewatch.json"))
            .await
            .unwrap();
        store.save(sample_document()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileAlertStore::open(dir.path().join("nope.json")).await.unwrap();
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cas_write_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir).await;

        assert!(store.update_trigger_state("a1", false, true).await.unwrap());
        assert!(!store.update_trigger_state("a1", false, true).await.unwrap());

        let reopened = JsonFileAlertStore::open(store.path()).await.unwrap();
        let alert = reopened.get("a1").await.unwrap().unwrap();
        assert!(alert.is_triggered);
        assert!(!reopened.get("a2").await.unwrap().unwrap().is_triggered);
        assert!(!dir.path().join("hivewatch.json.tmp").exists());
    }

    #[tokio::test]
    async fn edits_between_writes_are_seen() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir).await;

        let mut doc = sample_document();
        doc.alerts.push(Alert::new("a3", "h3", "Loud", "[]"));
        tokio::fs::write(store.path(), serde_json::to_vec(&doc).unwrap())
            .await
            .unwrap();

        let ids: Vec<_> = store.list_all().await.unwrap().into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a1", "a2", "a3"]);
    }

    #[tokio::test]
    async fn unknown_alert_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir).await;
        let err = store.update_trigger_state("a9", false, true).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn corrupt_document_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hivewatch.json");
        tokio::fs::write(&path, b"{ not json").await.unwrap();
        let err = JsonFileAlertStore::open(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[tokio::test]
    async fn owner_directory_reads_users_and_hives() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded(&dir).await;

        let owner = store.owner_of_hive("h3").await.unwrap().unwrap();
        assert_eq!(owner.email, "quiet@example.com");
        assert!(!owner.notifications_enabled);
        assert!(store.owner_of_hive("h9").await.unwrap().is_none());
        assert_eq!(store.hives_of_user("u1").await.unwrap(), vec!["h1", "h2"]);
    }
}
