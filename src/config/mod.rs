//! 配置管理
//!
//! 配置来源优先级（由低到高）：`config.toml` → `config.{APP_ENV}.toml` → 环境变量。

mod r#impl;
mod structs;

pub use structs::*;
