//! HTTP request handlers

pub mod logs;
pub mod page;
pub mod search;
pub mod status;
