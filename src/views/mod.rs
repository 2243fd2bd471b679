//! View-models: page state containers the browser renders from.
//!
//! Failures never surface as dialogs. Each page keeps a list of inline,
//! dismissible [`Notice`]s and each list carries its own [`ViewStatus`].

use chrono::{DateTime, Utc};
use serde::Serialize;
use crate::errors::ApiError;

pub mod list;
pub mod family;
pub mod job_form;
pub mod workspace;
pub mod users;
pub mod admin_workspaces;
pub mod admin_pces;
pub mod jobs;
pub mod dashboard;

pub use list::{ListPage, ListView};
pub use family::FamilyTable;

/// A stateful page. Each action may ask for one upstream call, whose
/// outcome comes back as the next action.
pub trait Reducer {
    type Action;
    type Effect;

    fn apply(&mut self, action: Self::Action) -> Option<Self::Effect>;
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ViewStatus {
    #[default]
    Idle,
    Loading,
    Empty,
    Loaded,
    Failed,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    AuthFailure,
    ServerError,
    ValidationFailure,
    NetworkFailure,
    Unsupported,
    Info,
}

impl NoticeKind {
    pub fn of(err: &ApiError) -> Self {
        match err {
            ApiError::Auth => NoticeKind::AuthFailure,
            ApiError::Validation(_) => NoticeKind::ValidationFailure,
            ApiError::Network(_) => NoticeKind::NetworkFailure,
            ApiError::Server(_) | ApiError::Decode(_) | ApiError::Shape(_) => NoticeKind::ServerError,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct Notices {
    #[serde(skip)]
    next_id: u64,
    items: Vec<Notice>,
}

impl Notices {
    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>) -> u64 {
        self.next_id += 1;
        self.items.push(Notice {
            id: self.next_id,
            kind,
            message: message.into(),
            at: Utc::now(),
        });
        self.next_id
    }

    pub fn report(&mut self, err: &ApiError) -> u64 {
        tracing::warn!("Reporting upstream failure: {}", err);
        self.push(NoticeKind::of(err), err.to_string())
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|notice| notice.id != id);
        self.items.len() != before
    }

    pub fn items(&self) -> &[Notice] {
        &self.items
    }

    pub fn count(&self, kind: NoticeKind) -> usize {
        self.items.iter().filter(|notice| notice.kind == kind).count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_get_increasing_ids_and_dismiss() {
        let mut notices = Notices::default();
        let first = notices.push(NoticeKind::Info, "one");
        let second = notices.report(&ApiError::Server(503));
        assert!(second > first);
        assert_eq!(notices.count(NoticeKind::ServerError), 1);

        assert!(notices.dismiss(first));
        assert!(!notices.dismiss(first));
        assert_eq!(notices.items().len(), 1);
        assert!(notices.items()[0].message.contains("503"));
    }
}
