//! Block execution engine, session model, and templating boundary for the
//! runbook test executor (spec §4.4).

pub mod engine;
pub mod outputs;
pub mod result;
pub mod scope;
pub mod session;
pub mod template;
pub mod vars;

pub use engine::Executor;
pub use result::{ActualStatus, CaseStatus, StepResult, TestResult};
pub use scope::StepScope;
pub use session::Session;
pub use template::{MiniMustache, RenderError, TemplateEngine};
