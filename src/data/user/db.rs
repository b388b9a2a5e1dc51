use async_trait::async_trait;

use crate::data::DataClient;
use crate::error::StoreError;
use crate::role::Role;

use super::{UserRecord, USER_COLLECTION_NAME};

#[async_trait]
pub trait UserDbExt {
    /// Reads the stored user for a provider uid.
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Stores `role` for a provider uid, replacing any previous record.
    async fn register_user(&self, uid: &str, role: Role) -> Result<UserRecord, StoreError>;
}

#[async_trait]
impl UserDbExt for DataClient {
    async fn get_user(&self, uid: &str) -> Result<Option<UserRecord>, StoreError> {
        match self.get_doc(USER_COLLECTION_NAME, uid).await? {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn register_user(&self, uid: &str, role: Role) -> Result<UserRecord, StoreError> {
        let user = UserRecord::new(role);
        tracing::info!("Registering user {} with role '{}'", uid, user.role);

        self.add_item_with_id(USER_COLLECTION_NAME, uid, bson::to_document(&user)?)
            .await?;

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, Bson};

    #[tokio::test]
    async fn registered_user_reads_back() {
        let data = DataClient::memory();
        assert_eq!(data.get_user("uid-1").await.unwrap(), None);

        data.register_user("uid-1", Role::named("teacher"))
            .await
            .unwrap();

        assert_eq!(
            data.get_single_doc(USER_COLLECTION_NAME, "uid-1").await.unwrap(),
            doc! { "role": "teacher" }
        );
        assert_eq!(
            data.get_user("uid-1").await.unwrap(),
            Some(UserRecord::new(Role::named("teacher")))
        );
    }

    #[tokio::test]
    async fn missing_role_reads_as_unassigned() {
        let data = DataClient::memory();
        data.add_item_with_id(USER_COLLECTION_NAME, "uid-2", doc! { "name": "Ana" })
            .await
            .unwrap();

        let user = data.get_user("uid-2").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Unassigned);
    }

    #[tokio::test]
    async fn null_role_reads_as_unassigned() {
        let data = DataClient::memory();
        data.add_item_with_id(USER_COLLECTION_NAME, "uid-3", doc! { "role": Bson::Null })
            .await
            .unwrap();

        let user = data.get_user("uid-3").await.unwrap().unwrap();
        assert_eq!(user.role, Role::Unassigned);
    }

    #[tokio::test]
    async fn non_string_role_is_rejected() {
        let data = DataClient::memory();
        data.add_item_with_id(USER_COLLECTION_NAME, "uid-4", doc! { "role": 5 })
            .await
            .unwrap();

        assert!(matches!(
            data.get_user("uid-4").await,
            Err(StoreError::BsonDeserialize(_))
        ));
    }
}
