use async_trait::async_trait;

use crate::data::{DataClient, DocumentUpdate, StoredDocument, USER_ID_FIELD};
use crate::error::StoreError;

use super::{
    TaskAssignment, TaskRemoval, CLASS_ID_FIELD, TASK_ASSIGNMENT_COLLECTION_NAME, TASK_IDS_FIELD,
};

#[async_trait]
pub trait TaskAssignmentDbExt {
    /// Resets the assignment of a class to an empty task list.
    async fn create_task_assignment(&self, class_id: &str) -> Result<(), StoreError>;

    /// Adds `task_ids` to the class assignment, creating it when missing, and
    /// records `user_id` as its owner.
    async fn add_task_assignment(
        &self,
        class_id: &str,
        task_ids: &[String],
        user_id: &str,
    ) -> Result<(), StoreError>;

    /// With a class id, the assignment stored under that id. Otherwise every
    /// assignment owned by `user_id`.
    async fn load_task_assignments(
        &self,
        user_id: &str,
        class_id: Option<&str>,
    ) -> Result<Vec<StoredDocument>, StoreError>;

    async fn get_task_assignment(&self, class_id: &str) -> Result<TaskAssignment, StoreError>;

    async fn delete_task_assignment(
        &self,
        class_id: &str,
        task_id: &str,
    ) -> Result<TaskRemoval, StoreError>;
}

#[async_trait]
impl TaskAssignmentDbExt for DataClient {
    #[tracing::instrument(skip(self))]
    async fn create_task_assignment(&self, class_id: &str) -> Result<(), StoreError> {
        let assignment = TaskAssignment::new(class_id);
        self.add_item_with_id(
            TASK_ASSIGNMENT_COLLECTION_NAME,
            class_id,
            bson::to_document(&assignment)?,
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn add_task_assignment(
        &self,
        class_id: &str,
        task_ids: &[String],
        user_id: &str,
    ) -> Result<(), StoreError> {
        let update = DocumentUpdate::new()
            .array_union(TASK_IDS_FIELD, task_ids.iter().map(String::as_str))
            .set(USER_ID_FIELD, user_id)
            .set_on_insert(CLASS_ID_FIELD, class_id);

        let outcome = self
            .store()
            .update(TASK_ASSIGNMENT_COLLECTION_NAME, class_id, &update, true)
            .await?;

        if outcome.upserted {
            tracing::debug!("created task assignment for class {}", class_id);
        } else {
            tracing::debug!("extended task assignment for class {}", class_id);
        }
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn load_task_assignments(
        &self,
        user_id: &str,
        class_id: Option<&str>,
    ) -> Result<Vec<StoredDocument>, StoreError> {
        let items = match class_id {
            Some(class_id) => self
                .get_doc(TASK_ASSIGNMENT_COLLECTION_NAME, class_id)
                .await?
                .map(|data| StoredDocument::new(class_id, data))
                .into_iter()
                .collect(),
            None => {
                self.load_collection(TASK_ASSIGNMENT_COLLECTION_NAME, Some(user_id), None)
                    .await?
            }
        };

        tracing::debug!("loaded {} task assignments", items.len());
        Ok(items)
    }

    async fn get_task_assignment(&self, class_id: &str) -> Result<TaskAssignment, StoreError> {
        let document = self
            .get_single_doc(TASK_ASSIGNMENT_COLLECTION_NAME, class_id)
            .await?;
        Ok(bson::from_document(document)?)
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task_assignment(
        &self,
        class_id: &str,
        task_id: &str,
    ) -> Result<TaskRemoval, StoreError> {
        let update = DocumentUpdate::new().array_remove(TASK_IDS_FIELD, [task_id]);

        let outcome = self
            .store()
            .update(TASK_ASSIGNMENT_COLLECTION_NAME, class_id, &update, false)
            .await
            .map_err(|e| {
                tracing::error!("Error removing task assignment: {}", e);
                e
            })?;

        let removal = if !outcome.matched {
            tracing::warn!("task assignment document for class {} does not exist", class_id);
            TaskRemoval::MissingAssignment
        } else if !outcome.modified {
            tracing::warn!("task {} not found in class {}", task_id, class_id);
            TaskRemoval::NotAssigned
        } else {
            tracing::debug!("task {} removed from class {}", task_id, class_id);
            TaskRemoval::Removed
        };

        Ok(removal)
    }
}
