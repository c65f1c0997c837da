use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Represents the status of a todo item.
/// Stored as its snake_case name in the `todos.status` column.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TodoStatus {
    /// Not started yet.
    #[default]
    Pending,
    /// Currently being worked on.
    InProgress,
    /// Done.
    Completed,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in_progress",
            TodoStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(TodoStatus::Pending),
            "in_progress" => Ok(TodoStatus::InProgress),
            "completed" => Ok(TodoStatus::Completed),
            other => Err(format!(
                "unknown status `{}`, expected one of pending, in_progress, completed",
                other
            )),
        }
    }
}

/// A todo item as stored in the database and returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, PartialEq)]
pub struct Todo {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub status: TodoStatus,
    pub due_date: Option<DateTime<Utc>>,
    /// Owner of the todo.
    pub user_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /todos`.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateTodoRequest {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200, message = "title must be 1-200 characters"))]
    pub title: String,

    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: Option<String>,

    /// Blank or missing means `pending`.
    #[serde(default, deserialize_with = "blank_status")]
    pub status: Option<TodoStatus>,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Body of `PUT /todos/{id}`.
///
/// Every field is optional. Missing fields and empty strings leave the stored
/// value unchanged; there is no way to clear a field through this request.
#[derive(Debug, Default, Serialize, Deserialize, Validate)]
pub struct UpdateTodoRequest {
    #[validate(length(max = 200))]
    #[serde(default)]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, deserialize_with = "blank_status")]
    pub status: Option<TodoStatus>,

    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Raw query string of `GET /todos`.
///
/// Values stay strings here; the query engine coerces them, so a malformed
/// `page=abc` never rejects the request.
#[derive(Debug, Default, Deserialize)]
pub struct TodoListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

fn blank_status<'de, D>(deserializer: D) -> Result<Option<TodoStatus>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [TodoStatus::Pending, TodoStatus::InProgress, TodoStatus::Completed] {
            assert_eq!(status.as_str().parse::<TodoStatus>().unwrap(), status);
        }
        assert!("done".parse::<TodoStatus>().is_err());
    }

    #[test]
    fn test_create_request_validation() {
        let valid = CreateTodoRequest {
            title: "Buy milk".to_string(),
            description: None,
            status: None,
            due_date: None,
        };
        assert!(valid.validate().is_ok());

        let empty_title = CreateTodoRequest {
            title: "".to_string(),
            description: Some("Valid description".to_string()),
            status: None,
            due_date: None,
        };
        assert!(empty_title.validate().is_err());

        let long_title = CreateTodoRequest {
            title: "a".repeat(201),
            description: None,
            status: Some(TodoStatus::InProgress),
            due_date: None,
        };
        assert!(long_title.validate().is_err());

        let long_description = CreateTodoRequest {
            title: "Valid title".to_string(),
            description: Some("b".repeat(1001)),
            status: None,
            due_date: None,
        };
        assert!(long_description.validate().is_err());
    }

    #[test]
    fn test_blank_status_deserializes_as_none() {
        let create: CreateTodoRequest =
            serde_json::from_value(json!({"title": "x", "status": ""})).unwrap();
        assert_eq!(create.status, None);

        let update: UpdateTodoRequest = serde_json::from_value(json!({"status": "completed"})).unwrap();
        assert_eq!(update.status, Some(TodoStatus::Completed));

        let missing: UpdateTodoRequest = serde_json::from_value(json!({})).unwrap();
        assert_eq!(missing.status, None);
    }

    #[test]
    fn test_unknown_status_is_rejected_on_write() {
        let result: Result<CreateTodoRequest, _> =
            serde_json::from_value(json!({"title": "x", "status": "archived"}));
        assert!(result.is_err());
    }
}
