pub mod prompts;
pub mod provider;
pub mod providers;
pub mod qualifier;

pub use provider::{LlmError, LlmProvider, Message, Role};
pub use providers::create_provider;
pub use qualifier::{QualificationReport, QualificationStats, QualifyError, Qualifier};
