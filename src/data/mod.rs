use std::sync::Arc;

use bson::Document;

use crate::error::StoreError;
use crate::util;

pub mod memory;
pub mod mongo;
pub mod store;
pub mod task;
pub mod user;

pub use memory::MemoryStore;
pub use mongo::MongoStore;
pub use store::{DocumentStore, DocumentUpdate, Filter, StoredDocument, UpdateOutcome};

/// Field holding the owning user of a document.
pub static USER_ID_FIELD: &str = "userId";

/// Collection level access to the document store.
#[derive(Clone)]
pub struct DataClient {
    store: Arc<dyn DocumentStore>,
}

impl std::fmt::Debug for DataClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataClient")
    }
}

impl DataClient {
    pub fn new(store: Arc<dyn DocumentStore>) -> DataClient {
        DataClient { store }
    }

    /// Client over a fresh [MemoryStore].
    pub fn memory() -> DataClient {
        DataClient::new(Arc::new(MemoryStore::new()))
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Lists documents of a collection.
    ///
    /// Without `user_id` the whole collection is returned. `extra` narrows a
    /// `user_id` query by one more field and is ignored on its own.
    #[tracing::instrument(skip(self))]
    pub async fn load_collection(
        &self,
        collection: &str,
        user_id: Option<&str>,
        extra: Option<(&str, &str)>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let filter = match (user_id, extra) {
            (Some(user_id), Some((key, value))) => {
                Filter::all().eq(USER_ID_FIELD, user_id).eq(key, value)
            }
            (Some(user_id), None) => Filter::all().eq(USER_ID_FIELD, user_id),
            (None, _) => Filter::all(),
        };

        let items = self.store.list(collection, &filter).await?;
        tracing::debug!("loaded {} documents from {}", items.len(), collection);
        Ok(items)
    }

    /// Adds a document under a generated id and returns the id.
    #[tracing::instrument(skip(self, item))]
    pub async fn add_item(&self, collection: &str, item: Document) -> Result<String, StoreError> {
        let id = util::auto_id();
        self.store.insert(collection, &id, item).await?;
        tracing::debug!("item added to {}: {}", collection, id);
        Ok(id)
    }

    /// Merges the fields of `item` into an existing document.
    #[tracing::instrument(skip(self, item))]
    pub async fn update_item(
        &self,
        collection: &str,
        id: &str,
        item: Document,
    ) -> Result<(), StoreError> {
        let outcome = self
            .store
            .update(collection, id, &DocumentUpdate::merge(item), false)
            .await?;

        if !outcome.matched {
            return Err(StoreError::not_found(collection, id));
        }

        tracing::debug!("item updated in {}: {}", collection, id);
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete_item(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let existed = self.store.delete(collection, id).await?;
        tracing::debug!(existed, "item deleted from {}: {}", collection, id);
        Ok(())
    }

    /// Reads a document, failing with [StoreError::NotFound] when it's missing.
    #[tracing::instrument(skip(self))]
    pub async fn get_single_doc(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        self.get_doc(collection, id)
            .await?
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    pub async fn get_doc(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.store.get(collection, id).await
    }

    /// Writes `data` at `id`, replacing any existing document.
    #[tracing::instrument(skip(self, data))]
    pub async fn add_item_with_id(
        &self,
        collection: &str,
        id: &str,
        data: Document,
    ) -> Result<(), StoreError> {
        self.store.replace(collection, id, data).await?;
        tracing::debug!("item set in {}: {}", collection, id);
        Ok(())
    }
}
