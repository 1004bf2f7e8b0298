//! Incoming JSON bodies and the rules that turn them into store inputs.
//!
//! Payload fields arrive as raw JSON so that a wrong type becomes a field
//! error instead of rejecting the whole body. Cleaning works on
//! `Option<Option<T>>`: the outer option records whether the key was sent at
//! all, the inner one whether it was `null`. That is what lets a `PATCH` leave
//! fields alone while still rejecting explicit nulls.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    error::{ApiError, FieldErrors},
    models::{CategoryChanges, NewCategory, NewTodo, Priority, TodoChanges},
};

const REQUIRED: &str = "This field is required.";
const NOT_NULL: &str = "This field may not be null.";
const NOT_BLANK: &str = "This field may not be blank.";
const NOT_STRING: &str = "Not a valid string.";
const NOT_BOOLEAN: &str = "Must be a valid boolean.";
const BAD_DATE: &str = "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.";

const TRUE_WORDS: [&str; 12] = ["true", "True", "TRUE", "t", "T", "yes", "Yes", "YES", "y", "Y", "on", "1"];
const FALSE_WORDS: [&str; 12] = ["false", "False", "FALSE", "f", "F", "no", "No", "NO", "n", "N", "off", "0"];

/// Keeps an explicit `null` as `Some(Value::Null)` instead of folding it into `None`.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_i64() || n.is_u64() => "int",
        Value::Number(_) => "float",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Collects field errors while a payload is cleaned.
struct Cleaner {
    errors: FieldErrors,
    partial: bool,
}

impl Cleaner {
    fn new(partial: bool) -> Self {
        Self {
            errors: FieldErrors::new(),
            partial,
        }
    }

    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors.entry(field.to_string()).or_default().push(message.into());
    }

    fn has_error(&self, field: &str) -> bool {
        self.errors.contains_key(field)
    }

    fn merge(&mut self, validation: Result<(), ValidationErrors>) {
        let Err(errors) = validation else {
            return;
        };
        if let ApiError::Validation(fields) = ApiError::from(errors) {
            for (field, messages) in fields {
                self.errors.entry(field).or_default().extend(messages);
            }
        }
    }

    /// Numbers are accepted as their decimal text.
    fn string(&mut self, field: &str, raw: Option<Value>, trim: bool) -> Option<Option<String>> {
        let text = match raw? {
            Value::Null => return Some(None),
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => {
                self.add(field, NOT_STRING);
                return None;
            }
        };
        Some(Some(if trim { text.trim().to_string() } else { text }))
    }

    fn boolean(&mut self, field: &str, raw: Option<Value>) -> Option<Option<bool>> {
        let parsed = match raw? {
            Value::Null => return Some(None),
            Value::Bool(b) => Some(b),
            Value::Number(n) => match n.as_i64() {
                Some(1) => Some(true),
                Some(0) => Some(false),
                _ => None,
            },
            Value::String(s) if TRUE_WORDS.contains(&s.as_str()) => Some(true),
            Value::String(s) if FALSE_WORDS.contains(&s.as_str()) => Some(false),
            _ => None,
        };

        match parsed {
            Some(b) => Some(Some(b)),
            None => {
                self.add(field, NOT_BOOLEAN);
                None
            }
        }
    }

    /// A nullable primary-key reference.
    fn pk(&mut self, field: &str, raw: Option<Value>) -> Option<Option<i32>> {
        let raw = raw?;
        let id = match &raw {
            Value::Null => return Some(None),
            Value::Number(n) if n.is_i64() || n.is_u64() => match n.as_i64().and_then(|v| i32::try_from(v).ok()) {
                Some(id) => Some(id),
                None => {
                    self.add(field, format!("Invalid pk \"{n}\" - object does not exist."));
                    return None;
                }
            },
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };

        match id {
            Some(id) => Some(Some(id)),
            None => {
                self.add(
                    field,
                    format!("Incorrect type. Expected pk value, received {}.", json_type(&raw)),
                );
                None
            }
        }
    }

    /// A non-nullable field. `required` is ignored for partial updates, and
    /// a field that already failed a type or length check adds nothing more.
    fn value<T>(&mut self, field: &str, value: Option<Option<T>>, required: bool) -> Option<T> {
        if self.has_error(field) {
            return None;
        }
        match value {
            Some(Some(v)) => Some(v),
            Some(None) => {
                self.add(field, NOT_NULL);
                None
            }
            None => {
                if required && !self.partial {
                    self.add(field, REQUIRED);
                }
                None
            }
        }
    }

    fn text(&mut self, field: &str, value: Option<Option<String>>, required: bool) -> Option<String> {
        let text = self.value(field, value, required)?;
        if text.is_empty() {
            self.add(field, NOT_BLANK);
            return None;
        }
        Some(text)
    }

    fn date(&mut self, field: &str, value: Option<Option<String>>, required: bool) -> Option<NaiveDate> {
        let raw = self.value(field, value, required)?;
        match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => Some(date),
            Err(_) => {
                self.add(field, BAD_DATE);
                None
            }
        }
    }

    fn choice(&mut self, field: &str, value: Option<Option<String>>) -> Option<Priority> {
        let raw = self.value(field, value, false)?;
        match raw.parse() {
            Ok(priority) => Some(priority),
            Err(message) => {
                self.add(field, message);
                None
            }
        }
    }

    fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CategoryPayload {
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, example = "Errands")]
    pub name: Option<Value>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, example = "#ff0000")]
    pub color: Option<Value>,
}

#[derive(Validate)]
struct CategoryFields {
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters."))]
    name: Option<Option<String>>,

    #[validate(length(max = 7, message = "Ensure this field has no more than 7 characters."))]
    color: Option<Option<String>>,
}

impl CategoryPayload {
    fn clean(self, partial: bool) -> Result<CategoryChanges, ApiError> {
        let mut cleaner = Cleaner::new(partial);
        let fields = CategoryFields {
            name: cleaner.string("name", self.name, true),
            color: cleaner.string("color", self.color, true),
        };
        cleaner.merge(fields.validate());

        let name = cleaner.text("name", fields.name, true);
        let color = cleaner.text("color", fields.color, true);
        cleaner.finish()?;

        Ok(CategoryChanges { name, color })
    }

    pub fn into_new(self, user_id: i32) -> Result<NewCategory, ApiError> {
        match self.clean(false)? {
            CategoryChanges { name: Some(name), color: Some(color) } => Ok(NewCategory { name, color, user_id }),
            _ => Err(ApiError::Internal("cleaned category is missing required fields".into())),
        }
    }

    /// `partial` is true for `PATCH`, where required fields may be omitted.
    pub fn into_changes(self, partial: bool) -> Result<CategoryChanges, ApiError> {
        self.clean(partial)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TodoPayload {
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, example = "Buy milk")]
    pub title: Option<Value>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Value>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<bool>)]
    pub completed: Option<Value>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<Priority>)]
    pub priority: Option<Value>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, format = Date, example = "2025-07-01")]
    pub due_date: Option<Value>,

    /// Category id; `null` detaches the todo from its category.
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<i32>)]
    pub category: Option<Value>,
}

#[derive(Validate)]
struct TodoFields {
    #[validate(length(max = 200, message = "Ensure this field has no more than 200 characters."))]
    title: Option<Option<String>>,
}

impl TodoPayload {
    fn clean(self, partial: bool) -> Result<TodoChanges, ApiError> {
        let mut cleaner = Cleaner::new(partial);
        let fields = TodoFields {
            title: cleaner.string("title", self.title, true),
        };
        cleaner.merge(fields.validate());

        let title = cleaner.text("title", fields.title, true);
        let description = cleaner.string("description", self.description, true);
        let description = cleaner.value("description", description, false);
        let completed = cleaner.boolean("completed", self.completed);
        let completed = cleaner.value("completed", completed, false);
        let priority = cleaner.string("priority", self.priority, false);
        let priority = cleaner.choice("priority", priority);
        let due_date = cleaner.string("due_date", self.due_date, false);
        let due_date = cleaner.date("due_date", due_date, true);
        let category_id = cleaner.pk("category", self.category);
        cleaner.finish()?;

        Ok(TodoChanges {
            title,
            description,
            completed,
            priority,
            due_date,
            category_id,
        })
    }

    /// Omitted optional fields take their defaults.
    pub fn into_new(self, user_id: i32) -> Result<NewTodo, ApiError> {
        let changes = self.clean(false)?;
        let (Some(title), Some(due_date)) = (changes.title, changes.due_date) else {
            return Err(ApiError::Internal("cleaned todo is missing required fields".into()));
        };

        Ok(NewTodo {
            title,
            description: changes.description.unwrap_or_default(),
            completed: changes.completed.unwrap_or(false),
            priority: changes.priority.unwrap_or_default(),
            due_date,
            category_id: changes.category_id.flatten(),
            user_id,
        })
    }

    /// `partial` is true for `PATCH`. Omitted fields keep their stored values either way.
    pub fn into_changes(self, partial: bool) -> Result<TodoChanges, ApiError> {
        self.clean(partial)
    }
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RegisterPayload {
    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = String, example = "ann")]
    pub username: Option<Value>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = String, format = Password)]
    pub password: Option<Value>,

    #[serde(default, deserialize_with = "deserialize_some")]
    #[schema(value_type = Option<String>, example = "ann@example.com")]
    pub email: Option<Value>,
}

#[derive(Validate)]
struct RegisterFields {
    #[validate(length(max = 150, message = "Ensure this field has no more than 150 characters."))]
    username: Option<Option<String>>,

    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    email: Option<Option<String>>,
}

/// A registration that passed validation; the password is still plaintext.
#[derive(Debug)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub email: String,
}

fn valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

impl RegisterPayload {
    pub fn clean(self) -> Result<Registration, ApiError> {
        let mut cleaner = Cleaner::new(false);
        let mut email = cleaner.string("email", self.email, true);
        if matches!(&email, Some(Some(address)) if address.is_empty()) {
            email = None;
        }
        let fields = RegisterFields {
            username: cleaner.string("username", self.username, true),
            email,
        };
        cleaner.merge(fields.validate());

        let username = cleaner.text("username", fields.username, true);
        if let Some(name) = &username {
            if !valid_username(name) {
                cleaner.add(
                    "username",
                    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
                );
            }
        }
        // passwords keep their whitespace
        let password = cleaner.string("password", self.password, false);
        let password = cleaner.text("password", password, true);
        let email = cleaner.value("email", fields.email, false);
        cleaner.finish()?;

        match (username, password) {
            (Some(username), Some(password)) => Ok(Registration {
                username,
                password,
                email: email.unwrap_or_default(),
            }),
            _ => Err(ApiError::Internal("cleaned registration is missing required fields".into())),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TokenRequest {
    pub username: String,
    #[schema(format = Password)]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access: String,
}
