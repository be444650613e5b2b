//! Common types used across the engines, registry and router

pub mod constants;
pub mod context;
pub mod errors;
pub mod identifiers;
