//! Storage ports. Services only see these traits; MongoDB backs them in
//! production and `memory` backs them in tests.

use async_trait::async_trait;

use crate::models::{Todo, User};

pub mod memory;
pub mod mongo;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    #[error("store backend error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `email` must already be lower-cased.
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    /// Fails with `Duplicate` if the email is taken.
    async fn insert(&self, user: &User) -> StoreResult<()>;
}

/// Every lookup and write is scoped by owner.
#[async_trait]
pub trait TodoStore: Send + Sync {
    async fn insert(&self, todo: &Todo) -> StoreResult<()>;

    async fn find_owned(&self, id: &str, owner_id: &str) -> StoreResult<Option<Todo>>;

    /// All of the owner's todos whose `isDeleted` equals `deleted`. Unordered.
    async fn list_owned(&self, owner_id: &str, deleted: bool) -> StoreResult<Vec<Todo>>;

    /// Overwrites the stored record with the same id and owner, but only
    /// while its `isDeleted` still equals `was_deleted`. Returns false if no
    /// such record exists, e.g. it was purged or moved in or out of the
    /// trash since it was read.
    async fn replace_owned(&self, todo: &Todo, was_deleted: bool) -> StoreResult<bool>;

    /// Returns false if nothing was removed.
    async fn delete_owned(&self, id: &str, owner_id: &str) -> StoreResult<bool>;
}
