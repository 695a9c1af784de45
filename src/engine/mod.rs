mod errors;
mod loader;
#[cfg(test)]
mod tests;
mod workflow;

pub use errors::{LoadError, WorkflowError};
pub use loader::{load_records, read_records};
pub use workflow::{Workflow, WorkflowState};
