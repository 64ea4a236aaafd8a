//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the authentication core:
//! - Logging and tracing infrastructure
//! - Typed auth event bus
//!
//! ## Overview
//!
//! This crate holds the runtime utilities the other crates depend on. It
//! establishes the logging conventions and the event broadcasting mechanism
//! used to tell the host about sign-in state changes.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
