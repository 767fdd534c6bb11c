//! Ultimo engine: typewriter output sequencing for browser text adventures.
//!
//! Renders sequences of timed dialogue lines character by character, cancels
//! in-flight animation when new output supersedes it, routes typed commands
//! through scene-local and global tables, and drives a scene graph with an
//! optional countdown per scene.

pub mod core;
pub mod schema;
