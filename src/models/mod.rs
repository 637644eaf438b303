//! Domain model module declarations.

pub mod checkpoint;
pub mod chunk;
pub mod event;
pub mod progress;
pub mod resource;
