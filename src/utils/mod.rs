//! Utilities for ReplayBot.
//!
//! This module aggregates utility helpers used across the crate.
//!
//! Submodules:
//! - `sleep`: Sleeps that wake early when a stop predicate fires.
//! - `images`: Base64 embedding of image files and file-name sanitizing.
//! - `window`: OS-specific window lookup helpers (no-op on unsupported platforms).

pub mod images;
pub mod sleep;
pub mod window;
