/*
 * Responsibility
 * - Tasks の request/response DTO
 * - validation (形式チェック) は validate() で行い、handler は 400 に変換するだけ
 * - due_date の「過去日不可」は呼び出し側が渡す today 基準
 */
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::repos::task_repo::TaskRow;

pub const TITLE_MAX_CHARS: usize = 100;
pub const DESCRIPTION_MAX_CHARS: usize = 1000;
pub const PRIORITIES: [&str; 3] = ["LOW", "MEDIUM", "HIGH"];
pub const STATUSES: [&str; 3] = ["TODO", "IN_PROGRESS", "DONE"];
pub const DEFAULT_STATUS: &str = "TODO";

fn check_title(title: &str) -> Result<(), &'static str> {
    if title.trim().is_empty() {
        return Err("title cannot be empty");
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err("title must be <= 100 chars");
    }
    Ok(())
}

fn check_description(description: Option<&str>) -> Result<(), &'static str> {
    match description {
        Some(d) if d.chars().count() > DESCRIPTION_MAX_CHARS => {
            Err("description must be <= 1000 chars")
        }
        _ => Ok(()),
    }
}

fn check_priority(priority: &str) -> Result<(), &'static str> {
    if PRIORITIES.contains(&priority) {
        Ok(())
    } else {
        Err("priority must be one of LOW, MEDIUM, HIGH")
    }
}

fn check_status(status: &str) -> Result<(), &'static str> {
    if STATUSES.contains(&status) {
        Ok(())
    } else {
        Err("status must be one of TODO, IN_PROGRESS, DONE")
    }
}

fn check_due_date(due_date: Option<NaiveDate>, today: NaiveDate) -> Result<(), &'static str> {
    match due_date {
        Some(date) if date < today => Err("due_date cannot be in the past"),
        _ => Ok(()),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl CreateTaskRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), &'static str> {
        let title = self.title.as_deref().ok_or("title is required")?;
        check_title(title)?;
        check_description(self.description.as_deref())?;
        let priority = self.priority.as_deref().ok_or("priority is required")?;
        check_priority(priority)?;
        if let Some(status) = &self.status {
            check_status(status)?;
        }
        check_due_date(self.due_date, today)
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub due_date: Option<NaiveDate>,
}

impl UpdateTaskRequest {
    pub fn validate(&self, today: NaiveDate) -> Result<(), &'static str> {
        if let Some(title) = &self.title {
            check_title(title)?;
        }
        check_description(self.description.as_deref())?;
        if let Some(priority) = &self.priority {
            check_priority(priority)?;
        }
        if let Some(status) = &self.status {
            check_status(status)?;
        }
        check_due_date(self.due_date, today)
    }
}

/// `GET /tasks?status=...`
#[derive(Debug, Default, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<String>,
}

impl ListTasksQuery {
    pub fn validate(&self) -> Result<(), &'static str> {
        match &self.status {
            Some(status) => check_status(status),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub priority: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub owner_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRow> for TaskResponse {
    fn from(row: TaskRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            priority: row.priority,
            status: row.status,
            due_date: row.due_date,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
    }

    fn empty() -> UpdateTaskRequest {
        UpdateTaskRequest {
            title: None,
            description: None,
            priority: None,
            status: None,
            due_date: None,
        }
    }

    fn create(title: Option<&str>, priority: Option<&str>) -> CreateTaskRequest {
        CreateTaskRequest {
            title: title.map(Into::into),
            description: None,
            priority: priority.map(Into::into),
            status: None,
            due_date: None,
        }
    }

    #[test]
    fn empty_update_is_valid() {
        assert!(empty().validate(today()).is_ok());
    }

    #[test]
    fn rejects_blank_or_long_title() {
        let req = UpdateTaskRequest {
            title: Some("   ".into()),
            ..empty()
        };
        assert_eq!(req.validate(today()), Err("title cannot be empty"));

        let req = UpdateTaskRequest {
            title: Some("x".repeat(TITLE_MAX_CHARS + 1)),
            ..empty()
        };
        assert!(req.validate(today()).is_err());
    }

    #[test]
    fn rejects_unknown_priority_and_status() {
        let req = UpdateTaskRequest {
            priority: Some("URGENT".into()),
            ..empty()
        };
        assert!(req.validate(today()).is_err());

        let req = UpdateTaskRequest {
            status: Some("done".into()),
            ..empty()
        };
        assert!(req.validate(today()).is_err());

        let req = UpdateTaskRequest {
            priority: Some("HIGH".into()),
            status: Some("IN_PROGRESS".into()),
            ..empty()
        };
        assert!(req.validate(today()).is_ok());
    }

    #[test]
    fn due_date_may_be_today_but_not_earlier() {
        let yesterday = today().pred_opt().unwrap();

        let req = UpdateTaskRequest {
            due_date: Some(today()),
            ..empty()
        };
        assert!(req.validate(today()).is_ok());

        let req = UpdateTaskRequest {
            due_date: Some(yesterday),
            ..empty()
        };
        assert_eq!(req.validate(today()), Err("due_date cannot be in the past"));

        let mut req = create(Some("write report"), Some("LOW"));
        req.due_date = Some(yesterday);
        assert!(req.validate(today()).is_err());
    }

    #[test]
    fn create_requires_title_and_priority() {
        assert!(create(Some("write report"), Some("LOW")).validate(today()).is_ok());
        assert_eq!(
            create(None, Some("LOW")).validate(today()),
            Err("title is required")
        );
        assert_eq!(
            create(Some("write report"), None).validate(today()),
            Err("priority is required")
        );

        let mut req = create(Some("write report"), Some("LOW"));
        req.status = Some("ARCHIVED".into());
        assert!(req.validate(today()).is_err());
    }

    #[test]
    fn list_query_accepts_known_status_only() {
        assert!(ListTasksQuery::default().validate().is_ok());
        let query = |s: &str| ListTasksQuery {
            status: Some(s.into()),
        };
        assert!(query("DONE").validate().is_ok());
        assert!(query("done").validate().is_err());
    }

    #[test]
    fn due_date_is_an_iso_date() {
        let req: UpdateTaskRequest = serde_json::from_str(r#"{"due_date":"2025-06-30"}"#).unwrap();
        assert_eq!(req.due_date, NaiveDate::from_ymd_opt(2025, 6, 30));
    }
}
