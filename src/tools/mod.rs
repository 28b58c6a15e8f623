//! 工具：Tool trait、注册表、带超时的执行器，以及专员可绑定的内置工具

pub mod executor;
pub mod knowledge_base;
pub mod offers;
pub mod registry;
pub mod schema;

pub use executor::ToolExecutor;
pub use knowledge_base::{RetrieveKnowledgeTool, RETRIEVE_TOOL_NAME};
pub use offers::{OffersTool, OFFERS_TOOL_NAME};
pub use registry::{FnTool, Tool, ToolRegistry};
pub use schema::parameters_schema;
