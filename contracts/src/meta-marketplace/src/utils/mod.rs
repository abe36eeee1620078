//! Shared utilities for the settlement engine.

pub mod bytes;
