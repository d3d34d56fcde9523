//! Task registry: the JSON task catalog behind `/api/tasks`.

mod record;
mod store;

pub use record::{TaskCatalog, TaskRecord, TaskStatus};
pub use store::TaskRegistry;
