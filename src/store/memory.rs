use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;

use super::Store;
use crate::{
    error::StoreError,
    models::{Category, CategoryChanges, NewCategory, NewTodo, NewUser, Todo, TodoChanges, User},
};

/// Process-local [`Store`] that mirrors the PostgreSQL schema rules:
/// unique usernames, cascading user deletes, set-null on category deletes.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    categories: Vec<Category>,
    todos: Vec<Todo>,
    next_user_id: i32,
    next_category_id: i32,
    next_todo_id: i32,
}

fn next(counter: &mut i32) -> i32 {
    *counter += 1;
    *counter
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

impl Tables {
    fn check_category(&self, category_id: Option<i32>) -> Result<(), StoreError> {
        match category_id {
            Some(id) if !self.categories.iter().any(|c| c.id == id) => Err(StoreError::UnknownCategory(id)),
            _ => Ok(()),
        }
    }

    fn detach_category(&mut self, category_id: i32) {
        for todo in self.todos.iter_mut().filter(|t| t.category_id == Some(category_id)) {
            todo.category_id = None;
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables()?;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(StoreError::UsernameTaken(user.username));
        }

        let created = User {
            id: next(&mut tables.next_user_id),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            date_joined: Utc::now(),
        };
        tables.users.push(created.clone());
        Ok(created)
    }

    async fn find_user(&self, id: i32) -> Result<Option<User>, StoreError> {
        Ok(self.tables()?.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        Ok(self.tables()?.users.iter().find(|u| u.username == username).cloned())
    }

    async fn delete_user(&self, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }

        let owned: Vec<i32> = tables
            .categories
            .iter()
            .filter(|c| c.user_id == id)
            .map(|c| c.id)
            .collect();
        for category_id in owned {
            tables.detach_category(category_id);
        }
        tables.categories.retain(|c| c.user_id != id);
        tables.todos.retain(|t| t.user_id != id);
        Ok(true)
    }

    async fn list_categories(&self, user_id: i32) -> Result<Vec<Category>, StoreError> {
        Ok(self
            .tables()?
            .categories
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_category(&self, user_id: i32, id: i32) -> Result<Option<Category>, StoreError> {
        Ok(self
            .tables()?
            .categories
            .iter()
            .find(|c| c.id == id && c.user_id == user_id)
            .cloned())
    }

    async fn insert_category(&self, category: NewCategory) -> Result<Category, StoreError> {
        let mut tables = self.tables()?;
        let created = Category {
            id: next(&mut tables.next_category_id),
            name: category.name,
            color: category.color,
            user_id: category.user_id,
        };
        tables.categories.push(created.clone());
        Ok(created)
    }

    async fn update_category(
        &self,
        user_id: i32,
        id: i32,
        changes: CategoryChanges,
    ) -> Result<Option<Category>, StoreError> {
        let mut tables = self.tables()?;
        let Some(category) = tables
            .categories
            .iter_mut()
            .find(|c| c.id == id && c.user_id == user_id)
        else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            category.name = name;
        }
        if let Some(color) = changes.color {
            category.color = color;
        }
        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, user_id: i32, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        let before = tables.categories.len();
        tables.categories.retain(|c| !(c.id == id && c.user_id == user_id));
        if tables.categories.len() == before {
            return Ok(false);
        }
        tables.detach_category(id);
        Ok(true)
    }

    async fn list_todos(&self, user_id: i32) -> Result<Vec<Todo>, StoreError> {
        Ok(self
            .tables()?
            .todos
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_todo(&self, user_id: i32, id: i32) -> Result<Option<Todo>, StoreError> {
        Ok(self
            .tables()?
            .todos
            .iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .cloned())
    }

    async fn insert_todo(&self, todo: NewTodo) -> Result<Todo, StoreError> {
        let mut tables = self.tables()?;
        tables.check_category(todo.category_id)?;

        let created = Todo {
            id: next(&mut tables.next_todo_id),
            title: todo.title,
            description: todo.description,
            completed: todo.completed,
            priority: todo.priority,
            due_date: todo.due_date,
            category_id: todo.category_id,
            user_id: todo.user_id,
            created_at: Utc::now(),
        };
        tables.todos.push(created.clone());
        Ok(created)
    }

    async fn update_todo(
        &self,
        user_id: i32,
        id: i32,
        changes: TodoChanges,
    ) -> Result<Option<Todo>, StoreError> {
        let mut tables = self.tables()?;
        if let Some(category_id) = changes.category_id {
            tables.check_category(category_id)?;
        }

        let Some(todo) = tables
            .todos
            .iter_mut()
            .find(|t| t.id == id && t.user_id == user_id)
        else {
            return Ok(None);
        };

        if let Some(title) = changes.title {
            todo.title = title;
        }
        if let Some(description) = changes.description {
            todo.description = description;
        }
        if let Some(completed) = changes.completed {
            todo.completed = completed;
        }
        if let Some(priority) = changes.priority {
            todo.priority = priority;
        }
        if let Some(due_date) = changes.due_date {
            todo.due_date = due_date;
        }
        if let Some(category_id) = changes.category_id {
            todo.category_id = category_id;
        }
        Ok(Some(todo.clone()))
    }

    async fn delete_todo(&self, user_id: i32, id: i32) -> Result<bool, StoreError> {
        let mut tables = self.tables()?;
        let before = tables.todos.len();
        tables.todos.retain(|t| !(t.id == id && t.user_id == user_id));
        Ok(tables.todos.len() != before)
    }
}
