use async_trait::async_trait;
use deadpool_diesel::postgres::Pool;
use diesel::{
    prelude::*,
    result::{DatabaseErrorKind, Error as DieselError},
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

use super::Store;
use crate::{
    error::StoreError,
    models::{Category, CategoryChanges, NewCategory, NewTodo, NewUser, Todo, TodoChanges, User},
    schema::{categories, todos, users},
};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// [`Store`] backed by PostgreSQL. Cascades and set-null rules live in the schema.
#[derive(Clone)]
pub struct PgStore {
    pool: Pool,
}

impl PgStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Applies pending migrations and returns how many ran.
    pub async fn migrate(&self) -> Result<usize, StoreError> {
        self.run(|conn| {
            conn.run_pending_migrations(MIGRATIONS)
                .map(|versions| versions.len())
                .map_err(|e| StoreError::Migration(e.to_string()))
        })
        .await
    }

    /// Runs blocking diesel work on a pooled connection.
    async fn run<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut PgConnection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self
            .pool
            .get()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        conn.interact(f)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
    }
}

/// Named in the `create_todos` migration.
const TODO_CATEGORY_FKEY: &str = "todos_category_id_fkey";

/// Maps a foreign key violation on `todos.category_id` to the category that was missing.
/// Any other violation, such as a vanished owner, stays a query error.
fn category_violation(err: DieselError, category_id: Option<i32>) -> StoreError {
    match (err, category_id) {
        (DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, info), Some(id))
            if info.constraint_name() == Some(TODO_CATEGORY_FKEY) =>
        {
            StoreError::UnknownCategory(id)
        }
        (other, _) => other.into(),
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        self.run(move |conn| {
            diesel::insert_into(users::table)
                .values(&user)
                .returning(User::as_returning())
                .get_result(conn)
                .map_err(|e| match e {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::UsernameTaken(user.username.clone())
                    }
                    other => other.into(),
                })
        })
        .await
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        self.run(move |conn| {
            users::table
                .find(id)
                .select(User::as_select())
                .first(conn)
                .optional()
                .map_err(Into::into)
        })
        .await
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        let username = username.to_owned();
        self.run(move |conn| {
            users::table
                .filter(users::username.eq(username))
                .select(User::as_select())
                .first(conn)
                .optional()
                .map_err(Into::into)
        })
        .await
    }

    async fn delete_user(&self, id: i32) -> Result<bool, StoreError> {
        self.run(move |conn| {
            let deleted = diesel::delete(users::table.find(id)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_categories(&self, user_id: i32) -> Result<Vec<Category>, StoreError> {
        self.run(move |conn| {
            categories::table
                .filter(categories::user_id.eq(user_id))
                .order(categories::id.asc())
                .select(Category::as_select())
                .load(conn)
                .map_err(Into::into)
        })
        .await
    }

    async fn get_category(&self, user_id: i32, id: i32) -> Result<Option<Category>, StoreError> {
        self.run(move |conn| {
            categories::table
                .find(id)
                .filter(categories::user_id.eq(user_id))
                .select(Category::as_select())
                .first(conn)
                .optional()
                .map_err(Into::into)
        })
        .await
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        self.run(move |conn| {
            diesel::insert_into(categories::table)
                .values(&category)
                .returning(Category::as_returning())
                .get_result(conn)
                .map_err(Into::into)
        })
        .await
    }

    async fn update_category(
        &self,
        user_id: i32,
        id: i32,
        changes: CategoryChanges,
    ) -> Result<Option<Category>, StoreError> {
        if changes.is_empty() {
            return self.get_category(user_id, id).await;
        }

        self.run(move |conn| {
            diesel::update(categories::table.find(id).filter(categories::user_id.eq(user_id)))
                .set(&changes)
                .returning(Category::as_returning())
                .get_result(conn)
                .optional()
                .map_err(Into::into)
        })
        .await
    }

    async fn delete_category(&self, user_id: i32, id: i32) -> Result<bool, StoreError> {
        self.run(move |conn| {
            let deleted =
                diesel::delete(categories::table.find(id).filter(categories::user_id.eq(user_id)))
                    .execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn list_todos(&self, user_id: i32) -> Result<Vec<Todo>, StoreError> {
        self.run(move |conn| {
            todos::table
                .filter(todos::user_id.eq(user_id))
                .order(todos::id.asc())
                .select(Todo::as_select())
                .load(conn)
                .map_err(Into::into)
        })
        .await
    }

    async fn get_todo(&self, user_id: i32, id: i32) -> Result<Option<Todo>, StoreError> {
        self.run(move |conn| {
            todos::table
                .find(id)
                .filter(todos::user_id.eq(user_id))
                .select(Todo::as_select())
                .first(conn)
                .optional()
                .map_err(Into::into)
        })
        .await
    }

    async fn insert_todo(&self, todo: NewTodo) -> Result<Todo, StoreError> {
        self.run(move |conn| {
            diesel::insert_into(todos::table)
                .values(&todo)
                .returning(Todo::as_returning())
                .get_result(conn)
                .map_err(|e| category_violation(e, todo.category_id))
        })
        .await
    }

    async fn update_todo(
        &self,
        user_id: i32,
        id: i32,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        if changes.is_empty() {
            return self.get_todo(user_id, id).await;
        }

        self.run(move |conn| {
            diesel::update(todos::table.find(id).filter(todos::user_id.eq(user_id)))
                .set(&changes)
                .returning(Todo::as_returning())
                .get_result(conn)
                .optional()
                .map_err(|e| category_violation(e, changes.category_id.flatten()))
        })
        .await
    }

    async fn delete_todo(&self, user_id: i32, id: i32) -> Result<bool, StoreError> {
        self.run(move |conn| {
            let deleted = diesel::delete(todos::table.find(id).filter(todos::user_id.eq(user_id)))
                .execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }
}
