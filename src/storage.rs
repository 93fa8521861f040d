//! Persistencia de quejas.
//!
//! Dos adaptadores detrás del trait `ComplaintStore`:
//!   - `MemoryComplaintStore`: en memoria, para pruebas y despliegues efímeros.
//!   - `JsonFileComplaintStore`: un único fichero JSON con el array de quejas.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::StorageError;
use crate::models::{Complaint, ComplaintStatus};

pub type StorageResult<T> = Result<T, StorageError>;

/// Filtros opcionales de `list`; comparación exacta.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintFilter {
    pub status: Option<ComplaintStatus>,
    pub category: Option<String>,
    pub department: Option<String>,
}

impl ComplaintFilter {
    pub fn matches(&self, complaint: &Complaint) -> bool {
        if let Some(status) = self.status {
            if complaint.status != status {
                return false;
            }
        }
        if let Some(category) = &self.category {
            if complaint.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(department) = &self.department {
            if complaint.department.as_deref() != Some(department.as_str()) {
                return false;
            }
        }
        true
    }
}

#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Guarda una queja nueva.
    async fn insert(&self, complaint: &Complaint) -> StorageResult<()>;

    /// Quejas que cumplen el filtro, en orden de inserción.
    async fn list(&self, filter: &ComplaintFilter) -> StorageResult<Vec<Complaint>>;

    async fn get(&self, id: &str) -> StorageResult<Complaint>;

    /// Cambia el estado y actualiza `updatedAt`.
    async fn update_status(&self, id: &str, status: ComplaintStatus) -> StorageResult<Complaint>;
}

fn apply_status(complaints: &mut [Complaint], id: &str, status: ComplaintStatus) -> StorageResult<Complaint> {
    let complaint = complaints
        .iter_mut()
        .find(|c| c.id == id)
        .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
    complaint.status = status;
    complaint.updated_at = Some(Utc::now());
    Ok(complaint.clone())
}

#[derive(Debug, Default)]
pub struct MemoryComplaintStore {
    complaints: RwLock<Vec<Complaint>>,
}

impl MemoryComplaintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComplaintStore for MemoryComplaintStore {
    async fn insert(&self, complaint: &Complaint) -> StorageResult<()> {
        self.complaints.write().await.push(complaint.clone());
        Ok(())
    }

    async fn list(&self, filter: &ComplaintFilter) -> StorageResult<Vec<Complaint>> {
        let complaints = self.complaints.read().await;
        Ok(complaints.iter().filter(|c| filter.matches(c)).cloned().collect())
    }

    async fn get(&self, id: &str) -> StorageResult<Complaint> {
        self.complaints
            .read()
            .await
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn update_status(&self, id: &str, status: ComplaintStatus) -> StorageResult<Complaint> {
        let mut complaints = self.complaints.write().await;
        apply_status(&mut complaints, id, status)
    }
}

/// Almacén en un fichero JSON. Cada escritura reescribe el fichero completo a
/// través de un temporal en el mismo directorio y un `rename`.
#[derive(Debug)]
pub struct JsonFileComplaintStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileComplaintStore {
    /// Abre el fichero, creándolo con un array vacío si no existe.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        if !tokio::fs::try_exists(&path).await? {
            info!("Creando el almacén de quejas en {}", path.display());
            write_all(&path, &[]).await?;
        }

        let store = Self {
            path,
            write_lock: Mutex::new(()),
        };
        // Falla pronto si el contenido existente está corrupto.
        let existing = store.read_all().await?;
        info!(
            "Almacén JSON abierto en {} ({} quejas)",
            store.path.display(),
            existing.len()
        );
        Ok(store)
    }

    async fn read_all(&self) -> StorageResult<Vec<Complaint>> {
        let bytes = tokio::fs::read(&self.path).await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

async fn write_all(path: &Path, complaints: &[Complaint]) -> StorageResult<()> {
    let bytes = serde_json::to_vec_pretty(complaints)?;
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!("{} quejas escritas en {}", complaints.len(), path.display());
    Ok(())
}

#[async_trait]
impl ComplaintStore for JsonFileComplaintStore {
    async fn insert(&self, complaint: &Complaint) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut complaints = self.read_all().await?;
        complaints.push(complaint.clone());
        write_all(&self.path, &complaints).await
    }

    async fn list(&self, filter: &ComplaintFilter) -> StorageResult<Vec<Complaint>> {
        let complaints = self.read_all().await?;
        Ok(complaints.into_iter().filter(|c| filter.matches(c)).collect())
    }

    async fn get(&self, id: &str) -> StorageResult<Complaint> {
        self.read_all()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| StorageError::NotFound(id.to_string()))
    }

    async fn update_status(&self, id: &str, status: ComplaintStatus) -> StorageResult<Complaint> {
        let _guard = self.write_lock.lock().await;
        let mut complaints = self.read_all().await?;
        let updated = apply_status(&mut complaints, id, status)?;
        write_all(&self.path, &complaints).await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio_test::{assert_err, assert_ok};

    fn complaint(id: &str, category: &str, department: &str) -> Complaint {
        Complaint {
            id: id.to_string(),
            title: format!("Queja {id}"),
            description: "The wifi is down".to_string(),
            category: Some(category.to_string()),
            department: Some(department.to_string()),
            priority: Some("High".to_string()),
            complaint_type: Some("Technical".to_string()),
            contact_info: None,
            user_type: None,
            status: ComplaintStatus::Pending,
            created_at: Utc::now(),
            updated_at: None,
            ai_analyzed: false,
            ai_confidence: None,
            sentiment: None,
        }
    }

    async fn exercise_store(store: &dyn ComplaintStore) {
        store.insert(&complaint("a", "Facilities", "IT Department")).await.unwrap();
        store.insert(&complaint("b", "Academic", "Academic Office")).await.unwrap();
        store.insert(&complaint("c", "Facilities", "Facilities Management")).await.unwrap();

        let all = store.list(&ComplaintFilter::default()).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a", "b", "c"]);

        let facilities = store
            .list(&ComplaintFilter {
                category: Some("Facilities".into()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(facilities.len(), 2);

        let updated = store.update_status("b", ComplaintStatus::Resolved).await.unwrap();
        assert_eq!(updated.status, ComplaintStatus::Resolved);
        assert!(updated.updated_at.is_some());

        let resolved = store
            .list(&ComplaintFilter {
                status: Some(ComplaintStatus::Resolved),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].id, "b");

        assert!(matches!(
            store.update_status("nope", ComplaintStatus::Resolved).await,
            Err(StorageError::NotFound(_))
        ));
        assert!(matches!(store.get("nope").await, Err(StorageError::NotFound(_))));
        assert_eq!(store.get("c").await.unwrap().department.as_deref(), Some("Facilities Management"));
    }

    #[tokio::test]
    async fn memory_store_operations() {
        exercise_store(&MemoryComplaintStore::new()).await;
    }

    #[tokio::test]
    async fn json_store_operations() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileComplaintStore::open(dir.path().join("data/complaints.json"))
            .await
            .unwrap();
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("complaints.json");
        {
            let store = JsonFileComplaintStore::open(&path).await.unwrap();
            store.insert(&complaint("a", "Facilities", "IT Department")).await.unwrap();
            store.update_status("a", ComplaintStatus::InProgress).await.unwrap();
        }
        let reopened = assert_ok!(JsonFileComplaintStore::open(&path).await);
        let stored = assert_ok!(reopened.get("a").await);
        assert_eq!(stored.status, ComplaintStatus::InProgress);
        assert!(!dir.path().join("complaints.json.tmp").exists());
    }

    #[tokio::test]
    async fn json_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("complaints.json");
        std::fs::write(&path, "[{ roto").unwrap();
        let err = assert_err!(JsonFileComplaintStore::open(&path).await);
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[tokio::test]
    async fn concurrent_inserts_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            JsonFileComplaintStore::open(dir.path().join("complaints.json"))
                .await
                .unwrap(),
        );
        let mut handles = Vec::new();
        for i in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .insert(&complaint(&format!("id-{i}"), "Facilities", "IT Department"))
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let all = store.list(&ComplaintFilter::default()).await.unwrap();
        assert_eq!(all.len(), 8);
    }
}
