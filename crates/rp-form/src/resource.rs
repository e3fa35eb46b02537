//! In-memory store of produced outputs, each addressable by a local URL.

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rp_core::ResourceId;

/// URL prefix under which resources are served.
pub const RESOURCE_PREFIX: &str = "/resources";

/// Locally addressable output bytes.
#[derive(Debug)]
pub struct OutputResource {
    pub id: ResourceId,
    pub data: Bytes,
    /// Always `video/<extension>`.
    pub mime: String,
    /// Suggested name for downloads.
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}

impl OutputResource {
    pub fn url(&self) -> String {
        resource_url(self.id)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

pub fn resource_url(id: ResourceId) -> String {
    format!("{RESOURCE_PREFIX}/{id}")
}

#[derive(Debug, Default)]
pub struct ResourceStore {
    resources: DashMap<ResourceId, Arc<OutputResource>>,
}

impl ResourceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(
        &self,
        data: impl Into<Bytes>,
        mime: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Arc<OutputResource> {
        let resource = Arc::new(OutputResource {
            id: ResourceId::new(),
            data: data.into(),
            mime: mime.into(),
            file_name: file_name.into(),
            created_at: Utc::now(),
        });
        self.resources.insert(resource.id, Arc::clone(&resource));
        tracing::debug!(
            resource_id = %resource.id,
            size = resource.len(),
            "Published output resource"
        );
        resource
    }

    pub fn get(&self, id: ResourceId) -> Option<Arc<OutputResource>> {
        self.resources.get(&id).map(|r| Arc::clone(r.value()))
    }

    /// Release a resource. Returns `false` if it was already gone.
    pub fn revoke(&self, id: ResourceId) -> bool {
        let removed = self.resources.remove(&id).is_some();
        if removed {
            tracing::debug!(resource_id = %id, "Revoked output resource");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_get_revoke() {
        let store = ResourceStore::new();
        let res = store.publish(vec![1u8, 2, 3], "video/webm", "clip.webm");
        assert_eq!(res.url(), format!("/resources/{}", res.id));
        assert_eq!(store.len(), 1);

        let fetched = store.get(res.id).unwrap();
        assert_eq!(fetched.data.as_ref(), &[1, 2, 3]);
        assert_eq!(fetched.mime, "video/webm");

        assert!(store.revoke(res.id));
        assert!(!store.revoke(res.id));
        assert!(store.get(res.id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn revoked_resource_stays_alive_for_holders() {
        let store = ResourceStore::new();
        let res = store.publish(Bytes::from_static(b"data"), "video/mp4", "a.mp4");
        store.revoke(res.id);
        assert_eq!(res.len(), 4);
    }
}
