//! Todo lifecycle: Active -> Trashed (soft delete) -> Active (restore),
//! and purge from either state. Everything is scoped to the caller;
//! a todo owned by someone else is reported as not found.

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;

use crate::app_state::AppState;
use crate::auth::Identity;
use crate::error::{ApiError, ApiResult};
use crate::middleware::CurrentUser;
use crate::models::{NewTodo, Todo, TodoPatch, TodoState};
use crate::store::TodoStore;

fn not_found() -> ApiError {
    ApiError::NotFound("Todo not found".to_string())
}

fn title_required() -> ApiError {
    ApiError::Validation("Title is required".to_string())
}

#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, caller: &Identity, input: NewTodo) -> ApiResult<Todo> {
        let title = input
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(title_required)?
            .to_string();

        let todo = Todo::new(&caller.id, title, input, Utc::now());
        self.store.insert(&todo).await?;
        info!("Todo created: {} (owner {})", todo.id, caller.id);
        Ok(todo)
    }

    /// Active todos, newest created first.
    pub async fn list(&self, caller: &Identity) -> ApiResult<Vec<Todo>> {
        let mut todos = self.store.list_owned(&caller.id, false).await?;
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(todos)
    }

    /// Trashed todos, most recently deleted first.
    pub async fn list_trashed(&self, caller: &Identity) -> ApiResult<Vec<Todo>> {
        let mut todos = self.store.list_owned(&caller.id, true).await?;
        todos.sort_by(|a, b| b.deleted_at.cmp(&a.deleted_at));
        Ok(todos)
    }

    /// Only active todos can be edited; a trashed one must be restored first.
    pub async fn update(&self, caller: &Identity, id: &str, patch: TodoPatch) -> ApiResult<Todo> {
        if let Some(title) = &patch.title {
            if title.trim().is_empty() {
                return Err(title_required());
            }
        }
        let mut todo = self.find_in_state(caller, id, TodoState::Active).await?.ok_or_else(not_found)?;

        todo.apply(patch, Utc::now());
        self.save(&todo, TodoState::Active).await?;
        info!("Todo updated: {} (owner {})", todo.id, caller.id);
        Ok(todo)
    }

    /// Moves an active todo to the trash. Deleting an already trashed todo
    /// is not found, so the original `deletedAt` is kept.
    pub async fn soft_delete(&self, caller: &Identity, id: &str) -> ApiResult<Todo> {
        let mut todo = self.find_in_state(caller, id, TodoState::Active).await?.ok_or_else(not_found)?;

        todo.trash(Utc::now());
        self.save(&todo, TodoState::Active).await?;
        info!("Todo trashed: {} (owner {})", todo.id, caller.id);
        Ok(todo)
    }

    pub async fn restore(&self, caller: &Identity, id: &str) -> ApiResult<Todo> {
        let mut todo = self
            .find_in_state(caller, id, TodoState::Trashed)
            .await?
            .ok_or_else(|| ApiError::NotFound("Deleted todo not found".to_string()))?;

        todo.restore(Utc::now());
        self.save(&todo, TodoState::Trashed).await?;
        info!("Todo restored: {} (owner {})", todo.id, caller.id);
        Ok(todo)
    }

    /// Removes the record from either state and returns its last known value.
    pub async fn purge(&self, caller: &Identity, id: &str) -> ApiResult<Todo> {
        let todo = self.store.find_owned(id, &caller.id).await?.ok_or_else(not_found)?;

        if !self.store.delete_owned(id, &caller.id).await? {
            return Err(not_found());
        }
        info!("Todo purged: {} (owner {})", todo.id, caller.id);
        Ok(todo)
    }

    async fn find_in_state(
        &self,
        caller: &Identity,
        id: &str,
        state: TodoState,
    ) -> ApiResult<Option<Todo>> {
        Ok(self
            .store
            .find_owned(id, &caller.id)
            .await?
            .filter(|t| t.state() == state))
    }

    /// Writes back a todo that was read in state `read_as`. Fails as not
    /// found if it was purged or changed state in the meantime.
    async fn save(&self, todo: &Todo, read_as: TodoState) -> ApiResult<()> {
        if self.store.replace_owned(todo, read_as == TodoState::Trashed).await? {
            Ok(())
        } else {
            Err(not_found())
        }
    }
}

// GET /api/todos
pub async fn list_todos(
    data: web::Data<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<HttpResponse> {
    let todos = data.todos.list(&me).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Todos fetched successfully",
        "todos": todos,
    })))
}

// GET /api/todos/deleted/list
pub async fn list_deleted_todos(
    data: web::Data<AppState>,
    CurrentUser(me): CurrentUser,
) -> ApiResult<HttpResponse> {
    let todos = data.todos.list_trashed(&me).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Deleted todos fetched successfully",
        "todos": todos,
    })))
}

// POST /api/todos
pub async fn create_todo(
    data: web::Data<AppState>,
    CurrentUser(me): CurrentUser,
    body: web::Json<NewTodo>,
) -> ApiResult<HttpResponse> {
    let todo = data.todos.create(&me, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "message": "Todo created successfully",
        "todo": todo,
    })))
}

// PUT /api/todos/{id}
pub async fn update_todo(
    data: web::Data<AppState>,
    CurrentUser(me): CurrentUser,
    id: web::Path<String>,
    body: web::Json<TodoPatch>,
) -> ApiResult<HttpResponse> {
    let todo = data.todos.update(&me, &id, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Todo updated successfully",
        "todo": todo,
    })))
}

// DELETE /api/todos/{id}
pub async fn delete_todo(
    data: web::Data<AppState>,
    CurrentUser(me): CurrentUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let todo = data.todos.soft_delete(&me, &id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Todo deleted successfully",
        "todo": todo,
    })))
}

// PUT /api/todos/{id}/restore
pub async fn restore_todo(
    data: web::Data<AppState>,
    CurrentUser(me): CurrentUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let todo = data.todos.restore(&me, &id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Todo restored successfully",
        "todo": todo,
    })))
}

// DELETE /api/todos/{id}/permanent
pub async fn purge_todo(
    data: web::Data<AppState>,
    CurrentUser(me): CurrentUser,
    id: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let todo = data.todos.purge(&me, &id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "message": "Todo permanently deleted successfully",
        "todo": todo,
    })))
}
