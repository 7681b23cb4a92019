//! # Core Engine Module
//!
//! Shared abstractions used across the engine. Currently this is the unified
//! configuration consumed by the SDK context and the render system.

pub mod config;

pub use config::{Config, ConfigError, EngineConfig, RenderConfig, TechniqueKind};
