use async_trait::async_trait;
use futures_util::FutureExt;

use modernizr_core::models::{CreateUserRequest, UpdateUserRequest, User};
use modernizr_core::storage::{EntityId, Identity, Result, UserRepository};

use super::{applied, DualStore};

/// User repository that writes to both stores and routes reads by phase.
pub struct DualWriteUserRepository<R: ?Sized = dyn UserRepository> {
    store: DualStore<R>,
}

impl<R: UserRepository + ?Sized + 'static> DualWriteUserRepository<R> {
    pub fn new(store: DualStore<R>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<R: UserRepository + ?Sized + 'static> UserRepository for DualWriteUserRepository<R> {
    async fn find_by_id(&self, id: EntityId) -> Result<Option<User>> {
        self.store
            .read("find_by_id", id.to_string(), |repo| {
                async move { repo.find_by_id(id).await }.boxed()
            })
            .await
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        self.store
            .read("find_by_username", username.to_string(), |repo| {
                async move { repo.find_by_username(username).await }.boxed()
            })
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        self.store
            .read("find_by_email", email.to_string(), |repo| {
                async move { repo.find_by_email(email).await }.boxed()
            })
            .await
    }

    async fn create_user(&self, request: &CreateUserRequest, identity: Identity) -> Result<User> {
        let mirrored = request.clone();
        self.store
            .write(
                "create_user",
                request.username.clone(),
                |repo| async move { repo.create_user(request, identity).await }.boxed(),
                move |repo, user: &User| {
                    let identity = Identity::assigned(user.id, user.created_at);
                    async move { applied(repo.create_user(&mirrored, identity).await) }.boxed()
                },
            )
            .await
    }

    async fn update_user(
        &self,
        id: EntityId,
        changes: &UpdateUserRequest,
    ) -> Result<Option<User>> {
        let mirrored = changes.clone();
        self.store
            .write(
                "update_user",
                id.to_string(),
                |repo| async move { repo.update_user(id, changes).await }.boxed(),
                move |repo, _: &Option<User>| {
                    async move { applied(repo.update_user(id, &mirrored).await) }.boxed()
                },
            )
            .await
    }

    async fn delete_user(&self, id: EntityId) -> Result<bool> {
        self.store
            .write(
                "delete_user",
                id.to_string(),
                |repo| async move { repo.delete_user(id).await }.boxed(),
                move |repo, _: &bool| async move { repo.delete_user(id).await }.boxed(),
            )
            .await
    }

    async fn upgrade_to_seller(&self, id: EntityId) -> Result<Option<User>> {
        self.store
            .write(
                "upgrade_to_seller",
                id.to_string(),
                |repo| async move { repo.upgrade_to_seller(id).await }.boxed(),
                move |repo, _: &Option<User>| {
                    async move { applied(repo.upgrade_to_seller(id).await) }.boxed()
                },
            )
            .await
    }

    async fn exists_by_username(&self, username: &str) -> Result<bool> {
        self.store
            .read("exists_by_username", username.to_string(), |repo| {
                async move { repo.exists_by_username(username).await }.boxed()
            })
            .await
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool> {
        self.store
            .read("exists_by_email", email.to_string(), |repo| {
                async move { repo.exists_by_email(email).await }.boxed()
            })
            .await
    }

    async fn promote_to_super_admin(&self, id: EntityId) -> Result<Option<User>> {
        self.store
            .write(
                "promote_to_super_admin",
                id.to_string(),
                |repo| async move { repo.promote_to_super_admin(id).await }.boxed(),
                move |repo, _: &Option<User>| {
                    async move { applied(repo.promote_to_super_admin(id).await) }.boxed()
                },
            )
            .await
    }

    async fn demote_from_super_admin(&self, id: EntityId) -> Result<Option<User>> {
        self.store
            .write(
                "demote_from_super_admin",
                id.to_string(),
                |repo| async move { repo.demote_from_super_admin(id).await }.boxed(),
                move |repo, _: &Option<User>| {
                    async move { applied(repo.demote_from_super_admin(id).await) }.boxed()
                },
            )
            .await
    }

    async fn find_all_super_admins(&self) -> Result<Vec<User>> {
        self.store
            .read("find_all_super_admins", String::from("*"), |repo| {
                async move { repo.find_all_super_admins().await }.boxed()
            })
            .await
    }
}
