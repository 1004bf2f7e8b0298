use std::{fmt, io::Write, str::FromStr};

use chrono::{DateTime, NaiveDate, Utc};
use diesel::{
    deserialize::{self, FromSql, FromSqlRow},
    expression::AsExpression,
    pg::{Pg, PgValue},
    prelude::*,
    serialize::{self, IsNull, Output, ToSql},
    sql_types::Text,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Urgency of a todo. Stored as its lowercase name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, AsExpression, FromSqlRow, ToSchema)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const CHOICES: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Priority::CHOICES
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("\"{s}\" is not a valid choice."))
    }
}

impl ToSql<Text, Pg> for Priority {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
        out.write_all(self.as_str().as_bytes())?;
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Pg> for Priority {
    fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
        let raw = std::str::from_utf8(bytes.as_bytes())?;
        raw.parse().map_err(Into::into)
    }
}

#[derive(Debug, Queryable, Selectable, Identifiable, Clone, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub date_joined: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = crate::schema::users)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Queryable, Selectable, Identifiable, Associations, Clone, PartialEq, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::categories)]
#[diesel(belongs_to(User))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub color: String,
    #[serde(rename = "user")]
    pub user_id: i32,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = crate::schema::categories)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub user_id: i32,
}

/// Column updates for a category; `None` leaves the column untouched.
#[derive(Debug, AsChangeset, Clone, Default)]
#[diesel(table_name = crate::schema::categories)]
pub struct CategoryChanges {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl CategoryChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.color.is_none()
    }
}

#[derive(Debug, Queryable, Selectable, Identifiable, Associations, Clone, PartialEq, Serialize, ToSchema)]
#[diesel(table_name = crate::schema::todos)]
#[diesel(belongs_to(User))]
#[diesel(belongs_to(Category))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Todo {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: NaiveDate,
    #[serde(rename = "category")]
    pub category_id: Option<i32>,
    #[serde(rename = "user")]
    pub user_id: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = crate::schema::todos)]
pub struct NewTodo {
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    pub due_date: NaiveDate,
    pub category_id: Option<i32>,
    pub user_id: i32,
}

/// Column updates for a todo. `category_id: Some(None)` clears the category.
#[derive(Debug, AsChangeset, Clone, Default)]
#[diesel(table_name = crate::schema::todos)]
pub struct TodoChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<NaiveDate>,
    pub category_id: Option<Option<i32>>,
}

impl TodoChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.completed.is_none()
            && self.priority.is_none()
            && self.due_date.is_none()
            && self.category_id.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_defaults_to_medium() {
        assert_eq!(Priority::default(), Priority::Medium);
    }

    #[test]
    fn priority_parses_only_known_choices() {
        assert_eq!("high".parse::<Priority>(), Ok(Priority::High));
        assert_eq!(
            "urgent".parse::<Priority>(),
            Err("\"urgent\" is not a valid choice.".to_string())
        );
        assert!("Low".parse::<Priority>().is_err());
    }

    #[test]
    fn todo_serializes_with_public_field_names() {
        let todo = Todo {
            id: 3,
            title: "water plants".into(),
            description: String::new(),
            completed: false,
            priority: Priority::Low,
            due_date: NaiveDate::from_ymd_opt(2025, 7, 1).unwrap(),
            category_id: None,
            user_id: 9,
            created_at: DateTime::from_timestamp(1_750_000_000, 0).unwrap(),
        };

        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["priority"], "low");
        assert_eq!(json["due_date"], "2025-07-01");
        assert_eq!(json["category"], serde_json::Value::Null);
        assert_eq!(json["user"], 9);
        assert!(json.get("category_id").is_none());
    }

    #[test]
    fn user_serializes_only_id_username_and_email() {
        let user = User {
            id: 1,
            username: "ann".into(),
            email: String::new(),
            password_hash: "$argon2id$secret".into(),
            date_joined: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 1, "username": "ann", "email": "" }));
    }
}
