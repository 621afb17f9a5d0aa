mod ids;
pub use ids::{ProjectId, SectionId, TaskId, UserId};

mod priority;
pub use priority::Priority;

mod task_status;
pub use task_status::TaskStatus;

mod task;
pub use task::Task;

mod section;
pub use section::Section;

mod draft;
pub use draft::{NewSection, NewTask};

mod patch;
pub use patch::{SectionPatch, TaskMove, TaskPatch};

mod board;
pub use board::Board;

mod token;
pub use token::TokenPair;

pub(crate) mod time_serde;

/// Ordering key within a section or a parent task.
///
/// Floats allow insertion between neighbors without renumbering the rest.
pub type Position = f64;
