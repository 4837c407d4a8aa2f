pub mod task;
pub mod user;

pub use task::{NewTask, Task, TaskBatch, TaskInput, TaskPatch, TaskStatus};
pub use user::{NewUser, User};
