//! In-process stores for tests and local experiments.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{StoreError, StoreResult, TodoStore, UserStore};
use crate::models::{Todo, User};

#[derive(Default)]
pub struct MemoryUserStore {
    // keyed by lower-cased email
    users: RwLock<HashMap<String, User>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(email).cloned())
    }

    async fn insert(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.contains_key(&user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        users.insert(user.email.clone(), user.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryTodoStore {
    todos: RwLock<HashMap<String, Todo>>,
}

impl MemoryTodoStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TodoStore for MemoryTodoStore {
    async fn insert(&self, todo: &Todo) -> StoreResult<()> {
        let mut todos = self.todos.write().await;
        if todos.contains_key(&todo.id) {
            return Err(StoreError::Duplicate(format!("todo {}", todo.id)));
        }
        todos.insert(todo.id.clone(), todo.clone());
        Ok(())
    }

    async fn find_owned(&self, id: &str, owner_id: &str) -> StoreResult<Option<Todo>> {
        Ok(self
            .todos
            .read()
            .await
            .get(id)
            .filter(|t| t.owner_id == owner_id)
            .cloned())
    }

    async fn list_owned(&self, owner_id: &str, deleted: bool) -> StoreResult<Vec<Todo>> {
        Ok(self
            .todos
            .read()
            .await
            .values()
            .filter(|t| t.owner_id == owner_id && t.is_deleted == deleted)
            .cloned()
            .collect())
    }

    async fn replace_owned(&self, todo: &Todo, was_deleted: bool) -> StoreResult<bool> {
        let mut todos = self.todos.write().await;
        match todos.get_mut(&todo.id) {
            Some(existing)
                if existing.owner_id == todo.owner_id && existing.is_deleted == was_deleted =>
            {
                *existing = todo.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_owned(&self, id: &str, owner_id: &str) -> StoreResult<bool> {
        let mut todos = self.todos.write().await;
        let owned = todos.get(id).is_some_and(|t| t.owner_id == owner_id);
        if owned {
            todos.remove(id);
        }
        Ok(owned)
    }
}
