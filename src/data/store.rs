use async_trait::async_trait;
use bson::{Bson, Document};
use serde::de::DeserializeOwned;

use crate::error::StoreError;

/// A document as it was read from a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

impl StoredDocument {
    pub fn new(id: impl ToString, data: Document) -> StoredDocument {
        StoredDocument {
            id: id.to_string(),
            data,
        }
    }

    /// Document contents with the `id` field merged in. Stored fields win over
    /// the injected id.
    pub fn into_document(self) -> Document {
        let mut result = Document::new();
        result.insert("id", self.id);
        result.extend(self.data);
        result
    }

    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        Ok(bson::from_document(self.data.clone())?)
    }
}

/// Equality filter over top level document fields. An empty filter matches
/// the whole collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    equals: Vec<(String, Bson)>,
}

impl Filter {
    pub fn all() -> Filter {
        Filter::default()
    }

    pub fn eq(mut self, field: impl ToString, value: impl Into<Bson>) -> Filter {
        self.equals.push((field.to_string(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, Bson)] {
        &self.equals
    }

    pub fn is_empty(&self) -> bool {
        self.equals.is_empty()
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.equals
            .iter()
            .all(|(field, value)| document.get(field) == Some(value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Overwrites the field.
    Set(Bson),
    /// Appends values the array doesn't contain yet. A missing field becomes
    /// an array.
    ArrayUnion(Vec<Bson>),
    /// Removes every occurrence of the values. A missing field is left alone.
    ArrayRemove(Vec<Bson>),
}

/// Field level changes applied to a single document in one write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    fields: Vec<(String, FieldUpdate)>,
    on_insert: Document,
}

impl DocumentUpdate {
    pub fn new() -> DocumentUpdate {
        DocumentUpdate::default()
    }

    /// Merge update setting every field of `document`.
    pub fn merge(document: Document) -> DocumentUpdate {
        document
            .into_iter()
            .fold(DocumentUpdate::new(), |update, (field, value)| {
                update.set(field, value)
            })
    }

    pub fn set(mut self, field: impl ToString, value: impl Into<Bson>) -> DocumentUpdate {
        self.fields
            .push((field.to_string(), FieldUpdate::Set(value.into())));
        self
    }

    pub fn array_union<V: Into<Bson>>(
        mut self,
        field: impl ToString,
        values: impl IntoIterator<Item = V>,
    ) -> DocumentUpdate {
        let values = values.into_iter().map(Into::into).collect();
        self.fields
            .push((field.to_string(), FieldUpdate::ArrayUnion(values)));
        self
    }

    pub fn array_remove<V: Into<Bson>>(
        mut self,
        field: impl ToString,
        values: impl IntoIterator<Item = V>,
    ) -> DocumentUpdate {
        let values = values.into_iter().map(Into::into).collect();
        self.fields
            .push((field.to_string(), FieldUpdate::ArrayRemove(values)));
        self
    }

    /// Field only written when an upsert creates the document.
    pub fn set_on_insert(mut self, field: impl ToString, value: impl Into<Bson>) -> DocumentUpdate {
        self.on_insert.insert(field.to_string(), value.into());
        self
    }

    pub fn fields(&self) -> &[(String, FieldUpdate)] {
        &self.fields
    }

    pub fn on_insert(&self) -> &Document {
        &self.on_insert
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.on_insert.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// A document with the id existed before the write.
    pub matched: bool,
    /// The write changed the stored document.
    pub modified: bool,
    /// The write created the document.
    pub upserted: bool,
}

/// Collection/id addressed document storage.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Lists documents matching `filter`. Order is backend defined.
    async fn list(&self, collection: &str, filter: &Filter)
        -> Result<Vec<StoredDocument>, StoreError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// Inserts a new document, failing if the id is taken.
    async fn insert(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError>;

    /// Creates or fully replaces the document at `id`.
    async fn replace(&self, collection: &str, id: &str, data: Document) -> Result<(), StoreError>;

    /// Applies `update` to the document at `id` atomically. With `upsert` a
    /// missing document is created from the update.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        update: &DocumentUpdate,
        upsert: bool,
    ) -> Result<UpdateOutcome, StoreError>;

    /// Removes the document, returning whether it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pretty_assertions::assert_eq;

    #[test]
    fn injected_id_is_merged_with_contents() {
        let stored = StoredDocument::new("a1", doc! { "name": "Algebra", "userId": "u1" });
        assert_eq!(
            stored.into_document(),
            doc! { "id": "a1", "name": "Algebra", "userId": "u1" }
        );

        let shadowed = StoredDocument::new("a1", doc! { "id": "custom" });
        assert_eq!(shadowed.into_document(), doc! { "id": "custom" });
    }

    #[test]
    fn filter_matches_exact_values() {
        let filter = Filter::all().eq("userId", "u1").eq("status", "open");
        assert!(filter.matches(&doc! { "userId": "u1", "status": "open", "x": 1 }));
        assert!(!filter.matches(&doc! { "userId": "u1", "status": "closed" }));
        assert!(!filter.matches(&doc! { "status": "open" }));
        assert!(Filter::all().matches(&doc! {}));
    }

    #[test]
    fn merge_sets_every_field() {
        let update = DocumentUpdate::merge(doc! { "a": 1, "b": "two" });
        assert_eq!(
            update.fields(),
            &[
                ("a".to_string(), FieldUpdate::Set(Bson::Int32(1))),
                ("b".to_string(), FieldUpdate::Set(Bson::String("two".to_string()))),
            ]
        );
        assert!(DocumentUpdate::merge(doc! {}).is_empty());
    }
}
