//! Pixelforge - image filter service
//!
//! This library crate exposes the service internals for the binary and for
//! integration testing.

pub mod activity;
pub mod catalog;
pub mod config;
pub mod naming;
pub mod pipeline;
pub mod server;
