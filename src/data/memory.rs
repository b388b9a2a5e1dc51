use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bson::{Bson, Document};
use tokio::sync::RwLock;

use super::store::{DocumentStore, DocumentUpdate, FieldUpdate, Filter, StoredDocument, UpdateOutcome};
use crate::error::StoreError;

type Collection = BTreeMap<String, Document>;

/// Process local store. Collections are kept in id order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }
}

fn array_field<'a>(
    document: &'a mut Document,
    field: &str,
) -> Result<Option<&'a mut Vec<Bson>>, StoreError> {
    match document.get_mut(field) {
        None => Ok(None),
        Some(Bson::Array(values)) => Ok(Some(values)),
        Some(other) => Err(StoreError::InvalidDocument(format!(
            "field '{}' holds {:?}, expected an array",
            field,
            other.element_type()
        ))),
    }
}

/// Applies `update` in place, returning whether anything changed.
fn apply_update(document: &mut Document, update: &DocumentUpdate) -> Result<bool, StoreError> {
    let mut modified = false;

    for (field, change) in update.fields() {
        match change {
            FieldUpdate::Set(value) => {
                let previous = document.insert(field.clone(), value.clone());
                modified |= previous.as_ref() != Some(value);
            }
            FieldUpdate::ArrayUnion(values) => {
                if array_field(document, field)?.is_none() {
                    document.insert(field.clone(), Bson::Array(vec![]));
                    modified = true;
                }
                if let Some(array) = array_field(document, field)? {
                    for value in values {
                        if !array.contains(value) {
                            array.push(value.clone());
                            modified = true;
                        }
                    }
                }
            }
            FieldUpdate::ArrayRemove(values) => {
                if let Some(array) = array_field(document, field)? {
                    let before = array.len();
                    array.retain(|it| !values.contains(it));
                    modified |= array.len() != before;
                }
            }
        }
    }

    Ok(modified)
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let collections = self.collections.read().await;
        let documents = match collections.get(collection) {
            Some(documents) => documents,
            None => return Ok(vec![]),
        };

        Ok(documents
            .iter()
            .filter(|(_, data)| filter.matches(data))
            .map(|(id, data)| StoredDocument::new(id, data.clone()))
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned())
    }

    async fn insert(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if documents.contains_key(id) {
            return Err(StoreError::InvalidDocument(format!(
                "document {}/{} already exists",
                collection, id
            )));
        }

        documents.insert(id.to_string(), data);
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        let mut collections = self.collections.write().await;
        collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), data);
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        update: &DocumentUpdate,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if let Some(existing) = documents.get(id) {
            // Changes are applied to a copy so a failing field leaves the
            // stored document untouched.
            let mut document = existing.clone();
            let modified = apply_update(&mut document, update)?;
            documents.insert(id.to_string(), document);

            return Ok(UpdateOutcome {
                matched: true,
                modified,
                upserted: false,
            });
        }

        if !upsert {
            return Ok(UpdateOutcome::default());
        }

        let mut document = update.on_insert().clone();
        apply_update(&mut document, update)?;
        documents.insert(id.to_string(), document);

        Ok(UpdateOutcome {
            matched: false,
            modified: false,
            upserted: true,
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .map(|documents| documents.remove(id).is_some())
            .unwrap_or(false))
    }
}
