//! glycodash-web — HTTP surface for Glycodash
//! Provides:
//!   - OAuth2 login and callback
//!   - Per-session dataset, summary, projection and facet views
//!   - Structural-context and branch-position charts

pub mod error;
pub mod handlers;
pub mod router;
pub mod session;
pub mod state;
