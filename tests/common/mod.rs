//! Shared builders for the integration suites
#![allow(dead_code)]

pub mod builders;

pub use builders::*;
