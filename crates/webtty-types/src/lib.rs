//! Foundation types and traits for webtty.
//!
//! This crate contains the platform-agnostic types shared by all webtty
//! crates: the error type, the configuration surface (settings and message
//! catalog), and the collaborator traits through which the terminal core
//! talks to its host (output sink and remote transport).

pub mod config;
pub mod error;
pub mod widget;
