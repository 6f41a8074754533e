pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{Message, Role, ToolCallRequest, ToolSpec};
