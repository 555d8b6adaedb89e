//! 认证模块
//!
//! 授权码由服务器端完成校验，这里只负责转交。

pub mod gconnect;
