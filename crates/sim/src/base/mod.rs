//! Foundational types shared by every part of the engine.
//!
//! This module provides the typed arena used to store model objects and
//! reference them by stable handle, plus the small numeric helpers the
//! processes rely on.

mod arena;
pub mod math;

pub use arena::{Arena, Id};
