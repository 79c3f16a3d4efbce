//! Shared types for presenced.
//!
//! This crate provides the vocabulary the rest of the workspace agrees on:
//! - Canonical presence states and the raw device-state mapping
//! - Configuration types loaded by the server binary

pub mod config;
pub mod presence;

pub use presence::PresenceState;
