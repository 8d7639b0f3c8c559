//! Baseline policy document loading from object storage

use crate::config::BaselineLocation;
use crate::document::PolicyDocument;
use crate::error::{PolicyError, PolicyResult};
use crate::service::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info};

/// Loads the canonical reset-state document
#[derive(Clone)]
pub struct BaselineLoader {
    store: Arc<dyn ObjectStore>,
    location: BaselineLocation,
}

impl BaselineLoader {
    pub fn new(store: Arc<dyn ObjectStore>, location: BaselineLocation) -> Self {
        Self { store, location }
    }

    pub fn location(&self) -> &BaselineLocation {
        &self.location
    }

    /// Fetch and parse the baseline document
    ///
    /// The object holds plain JSON; unlike identity service documents it is
    /// not URL-encoded.
    pub async fn load(&self) -> PolicyResult<PolicyDocument> {
        let BaselineLocation { bucket, key } = &self.location;
        debug!("Fetching baseline document {}", self.location);

        let bytes = self
            .store
            .get_object(bucket, key)
            .await?
            .ok_or_else(|| PolicyError::Fetch(format!("{} does not exist", self.location)))?;

        let text = std::str::from_utf8(&bytes)
            .map_err(|e| PolicyError::Fetch(format!("{} is not UTF-8: {}", self.location, e)))?;

        let document = PolicyDocument::from_json(text)
            .map_err(|e| PolicyError::Fetch(format!("{}: {}", self.location, e)))?;

        info!(
            "Loaded baseline document {} ({} statements)",
            self.location,
            document.statement.len()
        );

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryObjectStore;

    const BASELINE: &str = r#"{"Version":"2012-10-17","Statement":[{"Sid":"s","Effect":"Deny","Action":"*","Resource":"*","Condition":{"NotIpAddress":{"aws:SourceIp":["10.0.0.0/8"]}}}]}"#;

    fn setup_loader(contents: Option<&[u8]>) -> (Arc<InMemoryObjectStore>, BaselineLoader) {
        let store = Arc::new(InMemoryObjectStore::new());
        if let Some(data) = contents {
            store.put_object("policy-baseline", "allowlist/default.json", data.to_vec());
        }
        let location = BaselineLocation::new("policy-baseline", "allowlist/default.json");
        let loader = BaselineLoader::new(store.clone(), location);
        (store, loader)
    }

    #[tokio::test]
    async fn test_load_baseline() {
        let (_store, loader) = setup_loader(Some(BASELINE.as_bytes()));

        let document = loader.load().await.unwrap();
        assert_eq!(document.encode().unwrap(), BASELINE);
    }

    #[tokio::test]
    async fn test_load_missing_object() {
        let (_store, loader) = setup_loader(None);

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, PolicyError::Fetch(_)));
        assert!(err.to_string().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_load_malformed_object() {
        let (_store, loader) = setup_loader(Some(b"{\"Version\":\"2012-10-17\"}"));

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, PolicyError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_load_non_utf8_object() {
        let (_store, loader) = setup_loader(Some(&[0xff, 0xfe, 0x00]));

        let err = loader.load().await.unwrap_err();
        assert!(matches!(err, PolicyError::Fetch(_)));
    }

    #[tokio::test]
    async fn test_load_store_unavailable() {
        let (store, loader) = setup_loader(Some(BASELINE.as_bytes()));
        store.set_unavailable(true);

        let err = loader.load().await.unwrap_err();
        assert!(err.is_remote());
        assert!(err.to_string().contains("GetObject"));
    }
}
