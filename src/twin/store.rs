use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{TwinError, TwinResult};
use crate::twin::models::{CuttingDocument, NewCuttingData};

/// Filter for a cutting-data lookup. Both bounds are inclusive.
#[derive(Debug, Clone, Default)]
pub struct CuttingQuery {
    pub machine_id: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl CuttingQuery {
    pub fn machine(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: Some(machine_id.into()),
            ..Self::default()
        }
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    fn matches(&self, doc: &CuttingDocument) -> bool {
        if let Some(machine_id) = &self.machine_id {
            if &doc.machine_id != machine_id {
                return false;
            }
        }
        if let Some(start) = self.start {
            if doc.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if doc.timestamp > end {
                return false;
            }
        }
        true
    }
}

/// Document-store boundary for cutting data.
#[async_trait]
pub trait CuttingDataStore: Send + Sync {
    /// Stores a new document stamped with `at` and returns its id.
    async fn insert(&self, data: NewCuttingData, at: DateTime<Utc>) -> TwinResult<String>;

    /// Matching documents, newest first.
    async fn find(&self, query: &CuttingQuery) -> TwinResult<Vec<CuttingDocument>>;

    async fn latest(&self, machine_id: &str) -> TwinResult<Option<CuttingDocument>>;

    /// Machine ids in order of first appearance.
    async fn distinct_machines(&self) -> TwinResult<Vec<String>>;
}

#[derive(Debug, Default)]
pub struct InMemoryCuttingStore {
    documents: RwLock<Vec<CuttingDocument>>,
}

impl InMemoryCuttingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: Vec<CuttingDocument>) -> Self {
        Self {
            documents: RwLock::new(documents),
        }
    }

    /// Loads a JSON array of cutting documents.
    pub async fn load_seed(path: &Path) -> TwinResult<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let documents: Vec<CuttingDocument> = serde_json::from_str(&raw)?;
        info!(
            path = %path.display(),
            documents = documents.len(),
            "Loaded cutting-data seed"
        );
        Ok(Self::with_documents(documents))
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl CuttingDataStore for InMemoryCuttingStore {
    async fn insert(&self, data: NewCuttingData, at: DateTime<Utc>) -> TwinResult<String> {
        if data.machine_id.is_empty() {
            return Err(TwinError::invalid("machine_id", "must not be empty"));
        }
        let id = Uuid::new_v4().to_string();
        let document = data.into_document(id.clone(), at);
        debug!(id = %id, machine_id = %document.machine_id, "Inserting cutting data");
        self.documents.write().await.push(document);
        Ok(id)
    }

    async fn find(&self, query: &CuttingQuery) -> TwinResult<Vec<CuttingDocument>> {
        let documents = self.documents.read().await;
        let mut found: Vec<CuttingDocument> = documents
            .iter()
            .filter(|doc| query.matches(doc))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(found)
    }

    async fn latest(&self, machine_id: &str) -> TwinResult<Option<CuttingDocument>> {
        let documents = self.documents.read().await;
        Ok(documents
            .iter()
            .filter(|doc| doc.machine_id == machine_id)
            .max_by_key(|doc| doc.timestamp)
            .cloned())
    }

    async fn distinct_machines(&self) -> TwinResult<Vec<String>> {
        let documents = self.documents.read().await;
        let mut machines: Vec<String> = Vec::new();
        for doc in documents.iter() {
            if !machines.iter().any(|m| m == &doc.machine_id) {
                machines.push(doc.machine_id.clone());
            }
        }
        Ok(machines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn payload(machine_id: &str, cutting_time: f64) -> NewCuttingData {
        NewCuttingData {
            machine_id: machine_id.to_string(),
            cutting_time,
            ..NewCuttingData::default()
        }
    }

    #[tokio::test]
    async fn test_find_is_newest_first_and_window_inclusive() {
        let store = InMemoryCuttingStore::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        for i in 0..5 {
            store
                .insert(payload("M1", i as f64), t0 + Duration::hours(i))
                .await
                .unwrap();
        }
        store.insert(payload("M2", 99.0), t0).await.unwrap();

        let query = CuttingQuery::machine("M1").between(t0 + Duration::hours(1), t0 + Duration::hours(3));
        let found = store.find(&query).await.unwrap();
        let times: Vec<f64> = found.iter().map(|d| d.cutting_time).collect();
        assert_eq!(times, vec![3.0, 2.0, 1.0]);
    }

    #[tokio::test]
    async fn test_latest_and_distinct() {
        let store = InMemoryCuttingStore::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 10, 9, 0, 0).unwrap();
        store.insert(payload("B", 1.0), t0 + Duration::minutes(5)).await.unwrap();
        store.insert(payload("A", 2.0), t0).await.unwrap();
        store.insert(payload("B", 3.0), t0).await.unwrap();

        let latest = store.latest("B").await.unwrap().unwrap();
        assert_eq!(latest.cutting_time, 1.0);
        assert!(store.latest("C").await.unwrap().is_none());
        assert_eq!(store.distinct_machines().await.unwrap(), vec!["B", "A"]);
        assert_eq!(store.len().await, 3);
    }

    #[tokio::test]
    async fn test_insert_requires_machine_id() {
        let store = InMemoryCuttingStore::new();
        let err = store.insert(payload("", 1.0), Utc::now()).await.unwrap_err();
        assert!(err.is_client_error());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_load_seed_file() {
        let path = std::env::temp_dir().join(format!("twin-seed-{}.json", Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"_id": "1", "machine_id": "M9", "timestamp": "2024-02-01T08:00:00Z", "cutting_time": 12.5, "tool": "T4"}]"#,
        )
        .unwrap();

        let store = InMemoryCuttingStore::load_seed(&path).await.unwrap();
        let docs = store.find(&CuttingQuery::machine("M9")).await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].cutting_time, 12.5);
        assert_eq!(docs[0].extra["tool"], "T4");

        std::fs::remove_file(&path).unwrap();
    }
}
