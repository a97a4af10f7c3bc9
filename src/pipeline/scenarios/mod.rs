//! 内置垂直场景：每个市场前端一条流水线，共享同一阶段契约

pub mod appeals;
pub mod claims;
pub mod cob;
pub mod dispatch;
pub mod lending;
