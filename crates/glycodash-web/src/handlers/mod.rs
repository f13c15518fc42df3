//! HTTP handlers for all web routes.

pub mod auth;
pub mod context;
pub mod data;
pub mod session;
