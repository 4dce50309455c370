use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

/// Lifecycle state, derived from `is_deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoState {
    Active,
    Trashed,
}

/// A todo as stored in the `todos` collection and returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// Never changes after creation.
    #[serde(rename = "userId")]
    pub owner_id: String,
    #[serde(default)]
    pub is_deleted: bool,
    /// Set if and only if `is_deleted`.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a todo. Everything but the title is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "due_date::deserialize")]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update. Absent fields are left untouched; `dueDate: null`
/// clears the due date.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub is_completed: Option<bool>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "due_date::deserialize_patch")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

impl Todo {
    pub fn new(owner_id: &str, title: String, input: NewTodo, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title,
            description: input.description.unwrap_or_default(),
            is_completed: false,
            priority: input.priority.unwrap_or_default(),
            due_date: input.due_date,
            owner_id: owner_id.to_string(),
            is_deleted: false,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> TodoState {
        if self.is_deleted {
            TodoState::Trashed
        } else {
            TodoState::Active
        }
    }

    pub fn apply(&mut self, patch: TodoPatch, now: DateTime<Utc>) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(is_completed) = patch.is_completed {
            self.is_completed = is_completed;
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        self.updated_at = now;
    }

    pub fn trash(&mut self, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    pub fn restore(&mut self, now: DateTime<Utc>) {
        self.is_deleted = false;
        self.deleted_at = None;
        self.updated_at = now;
    }
}

/// `dueDate` accepts RFC 3339 or a bare `YYYY-MM-DD` (midnight UTC).
/// An empty string reads as null.
pub mod due_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{de, Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Result<DateTime<Utc>, String> {
        let raw = raw.trim();
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Ok(ts.with_timezone(&Utc));
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
            .ok_or_else(|| format!("invalid dueDate {:?}", raw))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => parse(&raw).map(Some).map_err(de::Error::custom),
            _ => Ok(None),
        }
    }

    pub fn deserialize_patch<'de, D>(
        deserializer: D,
    ) -> Result<Option<Option<DateTime<Utc>>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserialize(deserializer).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample(now: DateTime<Utc>) -> Todo {
        Todo::new("owner-1", "Buy milk".into(), NewTodo::default(), now)
    }

    #[test]
    fn new_todo_gets_defaults() {
        let now = Utc::now();
        let todo = sample(now);
        assert_eq!(todo.description, "");
        assert!(!todo.is_completed);
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.due_date, None);
        assert_eq!(todo.state(), TodoState::Active);
        assert_eq!(todo.deleted_at, None);
        assert_eq!(todo.created_at, now);
    }

    #[test]
    fn trash_and_restore_keep_deleted_at_in_sync() {
        let now = Utc::now();
        let mut todo = sample(now);

        todo.trash(now);
        assert_eq!(todo.state(), TodoState::Trashed);
        assert_eq!(todo.deleted_at, Some(now));

        todo.restore(now);
        assert_eq!(todo.state(), TodoState::Active);
        assert!(!todo.is_deleted);
        assert_eq!(todo.deleted_at, None);
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let now = Utc::now();
        let mut todo = sample(now);
        todo.due_date = Some(now);
        let patch: TodoPatch = serde_json::from_str(r#"{"isCompleted": true}"#).unwrap();

        todo.apply(patch, now);

        assert!(todo.is_completed);
        assert_eq!(todo.title, "Buy milk");
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.due_date, Some(now));
    }

    #[test]
    fn explicit_null_clears_due_date() {
        let patch: TodoPatch = serde_json::from_str(r#"{"dueDate": null}"#).unwrap();
        assert_eq!(patch.due_date, Some(None));

        let patch: TodoPatch = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(patch.due_date, None);
    }

    #[test]
    fn due_date_accepts_date_only_and_rfc3339() {
        let input: NewTodo =
            serde_json::from_str(r#"{"title": "x", "dueDate": "2025-03-01"}"#).unwrap();
        assert_eq!(input.due_date, Some(Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap()));

        let input: NewTodo =
            serde_json::from_str(r#"{"title": "x", "dueDate": "2025-03-01T10:30:00+02:00"}"#)
                .unwrap();
        assert_eq!(input.due_date, Some(Utc.with_ymd_and_hms(2025, 3, 1, 8, 30, 0).unwrap()));

        let input: NewTodo = serde_json::from_str(r#"{"title": "x", "dueDate": ""}"#).unwrap();
        assert_eq!(input.due_date, None);

        assert!(serde_json::from_str::<NewTodo>(r#"{"title": "x", "dueDate": "soon"}"#).is_err());
    }

    #[test]
    fn unknown_priority_is_rejected() {
        assert!(serde_json::from_str::<NewTodo>(r#"{"title": "x", "priority": "Urgent"}"#).is_err());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let json = serde_json::to_value(sample(Utc::now())).unwrap();
        for key in ["_id", "isCompleted", "dueDate", "userId", "isDeleted", "deletedAt", "createdAt"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(json["priority"], "Medium");
    }
}
