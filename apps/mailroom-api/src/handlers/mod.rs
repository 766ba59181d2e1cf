//! Handlers 模块

pub mod health;
pub mod mail_rooms;
pub mod metrics;
pub mod ws;

pub use health::*;
pub use mail_rooms::*;
pub use metrics::*;
pub use ws::*;
