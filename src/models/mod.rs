pub mod todo;
pub mod user;

pub use todo::{NewTodo, Priority, Todo, TodoPatch, TodoState};
pub use user::{PublicUser, Role, User};
