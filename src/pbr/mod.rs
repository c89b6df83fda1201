//! Companion (normal and specular) maps: the per-texture cache and the
//! atlas augmentation that keeps companion sprites aligned with their base
//! sprites.

pub mod atlas;
pub mod augment;
pub mod cache;
pub mod loader;
pub mod sprite;
pub mod sprite_holder;

pub use atlas::*;
pub use augment::*;
pub use cache::*;
pub use loader::*;
pub use sprite::*;
pub use sprite_holder::*;
