use serde::Serialize;
use crate::errors::ApiResult;
use crate::models::JobInfo;
use super::{Notices, ViewStatus};

/// Live details of one job.
#[derive(Debug, Clone, Serialize)]
pub struct JobDetail {
    pub job_id: i64,
    pub status: ViewStatus,
    pub info: Option<JobInfo>,
    /// Output is only meaningful once the PCE reports the job finished.
    pub finished: bool,
    pub notices: Notices,
}

impl JobDetail {
    pub fn loaded(job_id: i64, result: ApiResult<JobInfo>) -> Self {
        let mut notices = Notices::default();
        let (status, info) = match result {
            Ok(info) => (ViewStatus::Loaded, Some(info)),
            Err(err) => {
                notices.report(&err);
                (ViewStatus::Failed, None)
            }
        };
        let finished = info
            .as_ref()
            .map_or(false, |info| is_finished_state(&info.state));
        Self {
            job_id,
            status,
            info,
            finished,
            notices,
        }
    }
}

fn is_finished_state(state: &str) -> bool {
    matches!(state.to_ascii_lowercase().as_str(), "finished" | "completed" | "done")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ApiError;
    use crate::views::NoticeKind;

    #[test]
    fn failure_becomes_a_notice() {
        let detail = JobDetail::loaded(7, Err(ApiError::Server(502)));
        assert_eq!(detail.status, ViewStatus::Failed);
        assert!(detail.info.is_none());
        assert_eq!(detail.notices.count(NoticeKind::ServerError), 1);
    }

    #[test]
    fn finished_job_is_recognised() {
        let info = JobInfo {
            state: "Finished".into(),
            output: "Hello".into(),
            file: String::new(),
        };
        let detail = JobDetail::loaded(7, Ok(info));
        assert!(detail.finished);
        assert_eq!(detail.status, ViewStatus::Loaded);
        assert_eq!(serde_json::to_value(&detail).unwrap()["finished"], true);
    }

    #[test]
    fn running_job_is_not_finished() {
        let info = JobInfo {
            state: "Running".into(),
            output: String::new(),
            file: String::new(),
        };
        assert!(!JobDetail::loaded(7, Ok(info)).finished);
        assert!(!JobDetail::loaded(7, Err(ApiError::Server(502))).finished);
    }
}
