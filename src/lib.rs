// ABOUTME: Library root for fornax - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod build;
pub mod catalog;
pub mod cloud;
pub mod config;
pub mod error;
pub mod factory;
pub mod password;
pub mod pipeline;
pub mod retention;
pub mod triggers;
pub mod types;
pub mod worker;
