//! # Web API Request Handlers
//!
//! HTTP request handlers organized by pipeline stage.

pub mod assignment;
pub mod health;
pub mod polling;
pub mod processing;
