use std::sync::Arc;

use chrono::Duration;

use crate::auth::{AuthService, TokenKeys};
use crate::config::Config;
use crate::db::MongoDB;
use crate::store::memory::{MemoryTodoStore, MemoryUserStore};
use crate::store::mongo::{MongoTodoStore, MongoUserStore};
use crate::store::{TodoStore, UserStore};
use crate::todo::TodoService;

#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub todos: TodoService,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, users: Arc<dyn UserStore>, todos: Arc<dyn TodoStore>) -> Self {
        let keys = TokenKeys::new(&config.jwt_secret, Duration::days(config.token_ttl_days));
        Self {
            auth: AuthService::new(users, keys, config.bcrypt_cost),
            todos: TodoService::new(todos),
            config,
        }
    }

    pub fn with_mongo(config: Config, mongodb: &MongoDB) -> Self {
        Self::new(
            config,
            Arc::new(MongoUserStore::new(&mongodb.db)),
            Arc::new(MongoTodoStore::new(&mongodb.db)),
        )
    }

    /// Backed by in-process maps; nothing survives a restart.
    pub fn in_memory(config: Config) -> Self {
        Self::new(
            config,
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryTodoStore::new()),
        )
    }
}
