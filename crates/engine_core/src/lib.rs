//! Core engine types and utilities for Cityhold.
//!
//! This crate provides the foundational types used across the simulation:
//! - Transform and spatial helpers
//! - The fixed-step simulation clock
//! - Components shared by the player and hostile entities (health, lifecycle, AI state)

pub mod components;
pub mod time;
pub mod transform;

pub use components::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Quat, Vec2, Vec3};
pub use hecs::{Entity, World};
