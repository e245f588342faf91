//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the jukebox core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the queue core and the service
//! façade depend on. It establishes the logging conventions, the fail-fast
//! configuration of host bridges, and the event broadcasting used to turn
//! queue transitions into chat notifications.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
