use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::options::{ReplaceOptions, UpdateOptions};
use mongodb::{Collection, Database};

use super::store::{DocumentStore, DocumentUpdate, FieldUpdate, Filter, StoredDocument, UpdateOutcome};
use crate::error::StoreError;

pub static ID_FIELD: &str = "_id";

/// [DocumentStore] backed by a MongoDB database. Document ids are kept as
/// string `_id` values.
#[derive(Debug, Clone)]
pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(db: Database) -> MongoStore {
        MongoStore { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }
}

#[inline]
pub fn id_filter(id: &str) -> Document {
    let mut filter = Document::new();
    filter.insert(ID_FIELD, id);
    filter
}

pub fn filter_document(filter: &Filter) -> Document {
    filter
        .conditions()
        .iter()
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

/// Translates field updates into MongoDB update operators.
pub fn update_document(update: &DocumentUpdate) -> Document {
    let mut set = Document::new();
    let mut add_to_set = Document::new();
    let mut pull = Document::new();

    for (field, change) in update.fields() {
        match change {
            FieldUpdate::Set(value) => {
                set.insert(field.clone(), value.clone());
            }
            FieldUpdate::ArrayUnion(values) => {
                add_to_set.insert(field.clone(), doc! { "$each": values.clone() });
            }
            FieldUpdate::ArrayRemove(values) => {
                pull.insert(field.clone(), doc! { "$in": values.clone() });
            }
        }
    }

    let mut result = Document::new();
    if !set.is_empty() {
        result.insert("$set", set);
    }
    if !add_to_set.is_empty() {
        result.insert("$addToSet", add_to_set);
    }
    if !pull.is_empty() {
        result.insert("$pull", pull);
    }
    if !update.on_insert().is_empty() {
        result.insert("$setOnInsert", update.on_insert().clone());
    }
    result
}

fn with_id(id: &str, data: Document) -> Document {
    let mut document = id_filter(id);
    data.into_iter()
        .filter(|(field, _)| field != ID_FIELD)
        .for_each(|(field, value)| {
            document.insert(field, value);
        });
    document
}

fn split_id(mut document: Document) -> StoredDocument {
    let id = match document.remove(ID_FIELD) {
        Some(Bson::String(id)) => id,
        Some(Bson::ObjectId(id)) => id.to_hex(),
        Some(other) => other.to_string(),
        None => String::new(),
    };
    StoredDocument::new(id, document)
}

#[async_trait]
impl DocumentStore for MongoStore {
    async fn list(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let cursor = self
            .collection(collection)
            .find(filter_document(filter), None)
            .await?;

        let documents: Vec<Document> = cursor.try_collect().await?;
        Ok(documents.into_iter().map(split_id).collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let document = self
            .collection(collection)
            .find_one(id_filter(id), None)
            .await?;

        Ok(document.map(|it| split_id(it).data))
    }

    async fn insert(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        self.collection(collection)
            .insert_one(with_id(id, data), None)
            .await?;
        Ok(())
    }

    async fn replace(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError> {
        let options = ReplaceOptions::builder().upsert(true).build();
        self.collection(collection)
            .replace_one(id_filter(id), with_id(id, data), options)
            .await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        update: &DocumentUpdate,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError> {
        let collection = self.collection(collection);

        if update.is_empty() {
            // MongoDB refuses empty updates, only report whether the target exists.
            let count = collection.count_documents(id_filter(id), None).await?;
            return Ok(UpdateOutcome {
                matched: count > 0,
                ..Default::default()
            });
        }

        let options = UpdateOptions::builder().upsert(upsert).build();
        let result = collection
            .update_one(id_filter(id), update_document(update), options)
            .await?;

        Ok(UpdateOutcome {
            matched: result.matched_count > 0,
            modified: result.modified_count > 0,
            upserted: result.upserted_id.is_some(),
        })
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError> {
        let result = self
            .collection(collection)
            .delete_one(id_filter(id), None)
            .await?;
        Ok(result.deleted_count > 0)
    }
}
