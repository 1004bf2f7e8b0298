//! Persistence seam between the handlers and the database.
//!
//! Every category and todo operation takes the owning user's id; records owned
//! by someone else are reported exactly like missing ones.

mod memory;
mod pg;

pub use memory::MemoryStore;
pub use pg::{PgStore, MIGRATIONS};

use async_trait::async_trait;

use crate::{
    error::StoreError,
    models::{Category, CategoryChanges, NewCategory, NewTodo, NewUser, Todo, TodoChanges, User},
};

#[async_trait]
pub trait Store: Send + Sync {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError>;

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError>;

    /// Removes the user along with every category and todo they own.
    async fn delete_user(&self, id: i32) -> Result<bool, StoreError>;

    async fn list_categories(&self, user_id: i32) -> Result<Vec<Category>, StoreError>;

    async fn get_category(&self, user_id: i32, id: i32) -> Result<Option<Category>, StoreError>;

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError>;

    async fn update_category(
        &self,
        user_id: i32,
        id: i32,
        changes: CategoryChanges,
    ) -> Result<Option<Category>, StoreError>;

    /// Deleting a category detaches it from any todo that referenced it.
    async fn delete_category(&self, user_id: i32, id: i32) -> Result<bool, StoreError>;

    async fn list_todos(&self, user_id: i32) -> Result<Vec<Todo>, StoreError>;

    async fn get_todo(&self, user_id: i32, id: i32) -> Result<Option<Todo>, StoreError>;

    /// Fails with [`StoreError::UnknownCategory`] when the referenced category is gone.
    async fn insert_todo(&self, todo: NewTodo) -> Result<Todo, StoreError>;

    async fn update_todo(
        &self,
        user_id: i32,
        id: i32,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError>;

    async fn delete_todo(&self, user_id: i32, id: i32) -> Result<bool, StoreError>;
}
