//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Bit vectors for component and system membership
//! - Math types and operations
//! - Colours
//! - Logging utilities

pub mod bitset;
pub mod color;
pub mod math;
pub mod logging;
