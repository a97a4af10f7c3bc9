//! 核心编排层：错误类型、控制台状态机、事件流与渐进展示装饰器

pub mod console;
pub mod error;
pub mod events;
pub mod reveal;
pub mod state;

pub use console::ConsoleController;
pub use error::EngineError;
pub use events::ConsoleEvent;
pub use state::ConsolePhase;
