use serde::Serialize;
use crate::errors::ApiResult;
use crate::models::Keyed;
use super::{NoticeKind, Notices, ViewStatus};

/// One table on a page: rows, their load status and the selected row.
#[derive(Debug, Clone, Serialize)]
pub struct ListView<T> {
    status: ViewStatus,
    rows: Vec<T>,
    selected: Option<i64>,
}

impl<T> Default for ListView<T> {
    fn default() -> Self {
        Self {
            status: ViewStatus::Idle,
            rows: Vec::new(),
            selected: None,
        }
    }
}

impl<T: Keyed> ListView<T> {
    pub fn begin_load(&mut self) {
        self.status = ViewStatus::Loading;
    }

    /// Applies a fetch result. A failure reports exactly one notice and leaves the rows alone.
    pub fn finish_load(&mut self, result: ApiResult<Vec<T>>, notices: &mut Notices) {
        match result {
            Ok(rows) => self.replace(rows),
            Err(err) => {
                notices.report(&err);
                self.status = ViewStatus::Failed;
            }
        }
    }

    /// Marks the list failed when the failure was already reported elsewhere.
    pub fn fail(&mut self) {
        self.status = ViewStatus::Failed;
    }

    pub fn replace(&mut self, rows: Vec<T>) {
        self.status = if rows.is_empty() {
            ViewStatus::Empty
        } else {
            ViewStatus::Loaded
        };
        if let Some(id) = self.selected {
            if !rows.iter().any(|row| row.key() == id) {
                self.selected = None;
            }
        }
        self.rows = rows;
    }

    pub fn status(&self) -> ViewStatus {
        self.status
    }

    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    pub fn get(&self, id: i64) -> Option<&T> {
        self.rows.iter().find(|row| row.key() == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    /// Selects a row that is present; unknown ids leave the selection untouched.
    pub fn select(&mut self, id: i64) -> Option<&T> {
        if !self.contains(id) {
            return None;
        }
        self.selected = Some(id);
        self.get(id)
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Adds a row, replacing any row with the same id.
    pub fn push(&mut self, row: T) {
        let id = row.key();
        match self.rows.iter_mut().find(|existing| existing.key() == id) {
            Some(existing) => *existing = row,
            None => self.rows.push(row),
        }
        self.status = ViewStatus::Loaded;
    }

    pub fn update(&mut self, id: i64, change: impl FnOnce(&mut T)) -> bool {
        match self.rows.iter_mut().find(|row| row.key() == id) {
            Some(row) => {
                change(row);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: i64) -> Option<T> {
        let index = self.rows.iter().position(|row| row.key() == id)?;
        if self.selected == Some(id) {
            self.selected = None;
        }
        let row = self.rows.remove(index);
        if self.rows.is_empty() {
            self.status = ViewStatus::Empty;
        }
        Some(row)
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// A page made of a single list, as the admin catalog pages are.
#[derive(Debug, Clone, Serialize)]
pub struct ListPage<T> {
    pub list: ListView<T>,
    pub notices: Notices,
}

impl<T> Default for ListPage<T> {
    fn default() -> Self {
        Self {
            list: ListView::default(),
            notices: Notices::default(),
        }
    }
}

impl<T: Keyed> ListPage<T> {
    pub fn loaded(result: ApiResult<Vec<T>>) -> Self {
        let mut page = Self::default();
        page.list.begin_load();
        page.list.finish_load(result, &mut page.notices);
        page
    }

    pub fn info(mut self, message: impl Into<String>) -> Self {
        self.notices.push(NoticeKind::Info, message);
        self
    }

    /// Records an action the server offers no operation for.
    pub fn unsupported(mut self, action: &str) -> Self {
        self.notices.push(
            NoticeKind::Unsupported,
            format!("{} is not supported by the OnRamp server", action),
        );
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;
    use crate::models::Workspace;

    fn ws(id: i64) -> Workspace {
        Workspace {
            workspace_id: id,
            workspace_name: format!("ws{}", id),
            description: String::new(),
        }
    }

    #[test]
    fn auth_failure_reports_once_and_keeps_rows() {
        let mut list = ListView::default();
        let mut notices = Notices::default();
        list.finish_load(Ok(vec![ws(1), ws(2)]), &mut notices);
        assert_eq!(list.status(), ViewStatus::Loaded);

        list.begin_load();
        list.finish_load(Err(ApiError::Auth), &mut notices);

        assert_eq!(notices.count(NoticeKind::AuthFailure), 1);
        assert_eq!(notices.items().len(), 1);
        assert_eq!(list.rows().len(), 2);
        assert_eq!(list.status(), ViewStatus::Failed);
    }

    #[test]
    fn empty_result_is_distinct_from_failure() {
        let mut list: ListView<Workspace> = ListView::default();
        let mut notices = Notices::default();
        list.finish_load(Ok(Vec::new()), &mut notices);
        assert_eq!(list.status(), ViewStatus::Empty);
        assert!(notices.is_empty());
    }

    #[test]
    fn selection_tracks_rows() {
        let mut list = ListView::default();
        list.replace(vec![ws(1), ws(2)]);
        assert!(list.select(9).is_none());
        assert_eq!(list.select(2).map(|w| w.workspace_id), Some(2));

        list.replace(vec![ws(1)]);
        assert!(list.selected().is_none());

        list.select(1);
        assert!(list.remove(1).is_some());
        assert!(list.selected().is_none());
        assert_eq!(list.status(), ViewStatus::Empty);
    }

    #[test]
    fn push_replaces_same_id() {
        let mut list = ListView::default();
        list.push(ws(1));
        let mut renamed = ws(1);
        renamed.workspace_name = "renamed".into();
        list.push(renamed);
        assert_eq!(list.rows().len(), 1);
        assert_eq!(list.rows()[0].workspace_name, "renamed");
    }
}
