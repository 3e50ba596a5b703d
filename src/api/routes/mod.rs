//! API Routes
//!
//! Route handlers organized by functionality.

pub mod daily;
pub mod health;
