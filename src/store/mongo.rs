use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::{Collection, Database};
use serde::{Deserialize, Serialize};

use super::{StoreError, StoreResult, TodoStore, UserStore};
use crate::models::{Priority, Role, Todo, User};

pub const USERS: &str = "users";
pub const TODOS: &str = "todos";

const DUPLICATE_KEY: i32 = 11000;

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        match *err.kind {
            ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == DUPLICATE_KEY => {
                StoreError::Duplicate(we.message.clone())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

// Timestamps are kept as BSON dates (millisecond precision) so they sort
// and compare natively in the database.
fn to_bson(dt: DateTime<Utc>) -> bson::DateTime {
    bson::DateTime::from_millis(dt.timestamp_millis())
}

fn from_bson(dt: bson::DateTime) -> StoreResult<DateTime<Utc>> {
    Utc.timestamp_millis_opt(dt.timestamp_millis())
        .single()
        .ok_or_else(|| StoreError::Backend(format!("stored date out of range: {}", dt)))
}

fn from_bson_opt(dt: Option<bson::DateTime>) -> StoreResult<Option<DateTime<Utc>>> {
    dt.map(from_bson).transpose()
}

/// A user as laid out in the `users` collection.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserDocument {
    #[serde(rename = "_id")]
    id: String,
    email: String,
    password: String,
    name: String,
    #[serde(default)]
    role: Role,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl From<&User> for UserDocument {
    fn from(u: &User) -> Self {
        Self {
            id: u.id.clone(),
            email: u.email.clone(),
            password: u.password_hash.clone(),
            name: u.name.clone(),
            role: u.role,
            created_at: to_bson(u.created_at),
            updated_at: to_bson(u.updated_at),
        }
    }
}

impl TryFrom<UserDocument> for User {
    type Error = StoreError;

    fn try_from(d: UserDocument) -> StoreResult<Self> {
        Ok(Self {
            id: d.id,
            email: d.email,
            password_hash: d.password,
            name: d.name,
            role: d.role,
            created_at: from_bson(d.created_at)?,
            updated_at: from_bson(d.updated_at)?,
        })
    }
}

/// A todo as laid out in the `todos` collection.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TodoDocument {
    #[serde(rename = "_id")]
    id: String,
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    is_completed: bool,
    #[serde(default)]
    priority: Priority,
    #[serde(default)]
    due_date: Option<bson::DateTime>,
    user_id: String,
    #[serde(default)]
    is_deleted: bool,
    #[serde(default)]
    deleted_at: Option<bson::DateTime>,
    created_at: bson::DateTime,
    updated_at: bson::DateTime,
}

impl From<&Todo> for TodoDocument {
    fn from(t: &Todo) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            description: t.description.clone(),
            is_completed: t.is_completed,
            priority: t.priority,
            due_date: t.due_date.map(to_bson),
            user_id: t.owner_id.clone(),
            is_deleted: t.is_deleted,
            deleted_at: t.deleted_at.map(to_bson),
            created_at: to_bson(t.created_at),
            updated_at: to_bson(t.updated_at),
        }
    }
}

impl TryFrom<TodoDocument> for Todo {
    type Error = StoreError;

    fn try_from(d: TodoDocument) -> StoreResult<Self> {
        Ok(Self {
            id: d.id,
            title: d.title,
            description: d.description,
            is_completed: d.is_completed,
            priority: d.priority,
            due_date: from_bson_opt(d.due_date)?,
            owner_id: d.user_id,
            is_deleted: d.is_deleted,
            deleted_at: from_bson_opt(d.deleted_at)?,
            created_at: from_bson(d.created_at)?,
            updated_at: from_bson(d.updated_at)?,
        })
    }
}

pub struct MongoUserStore {
    users: Collection<UserDocument>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        Self {
            users: db.collection::<UserDocument>(USERS),
        }
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        self.users
            .find_one(doc! { "email": email })
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn insert(&self, user: &User) -> StoreResult<()> {
        self.users.insert_one(UserDocument::from(user)).await?;
        Ok(())
    }
}

pub struct MongoTodoStore {
    todos: Collection<TodoDocument>,
}

impl MongoTodoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            todos: db.collection::<TodoDocument>(TODOS),
        }
    }
}

#[async_trait]
impl TodoStore for MongoTodoStore {
    async fn insert(&self, todo: &Todo) -> StoreResult<()> {
        self.todos.insert_one(TodoDocument::from(todo)).await?;
        Ok(())
    }

    async fn find_owned(&self, id: &str, owner_id: &str) -> StoreResult<Option<Todo>> {
        self.todos
            .find_one(doc! { "_id": id, "userId": owner_id })
            .await?
            .map(Todo::try_from)
            .transpose()
    }

    async fn list_owned(&self, owner_id: &str, deleted: bool) -> StoreResult<Vec<Todo>> {
        let cursor = self
            .todos
            .find(doc! { "userId": owner_id, "isDeleted": deleted })
            .await?;
        let docs: Vec<TodoDocument> = cursor.try_collect().await?;
        docs.into_iter().map(Todo::try_from).collect()
    }

    async fn replace_owned(&self, todo: &Todo, was_deleted: bool) -> StoreResult<bool> {
        let filter = doc! {
            "_id": todo.id.as_str(),
            "userId": todo.owner_id.as_str(),
            "isDeleted": was_deleted,
        };
        let res = self
            .todos
            .replace_one(filter, TodoDocument::from(todo))
            .await?;
        Ok(res.matched_count > 0)
    }

    async fn delete_owned(&self, id: &str, owner_id: &str) -> StoreResult<bool> {
        let res = self
            .todos
            .delete_one(doc! { "_id": id, "userId": owner_id })
            .await?;
        Ok(res.deleted_count > 0)
    }
}
