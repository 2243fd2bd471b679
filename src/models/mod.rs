pub(crate) mod de;
mod user;
mod workspace;
mod pce;
mod module;
mod job;
mod forms;
pub mod table;

pub use user::User;
pub use workspace::{Workspace, PceModulePair, WorkspacePair};
pub use pce::Pce;
pub use module::{Module, ParamSchema, COMMON_FAMILY};
pub use job::{Job, JobInfo};
pub use forms::*;

/// Entities shown in list views are addressed by their numeric id.
pub trait Keyed {
    fn key(&self) -> i64;
}
