//! Interfaces to the host engine: asset storage, image decoding, the GPU
//! texture device, texture tracking and atlas lifecycle events.

pub mod assets;
pub mod codec;
pub mod device;
pub mod lifecycle;
pub mod tracker;

pub use assets::*;
pub use codec::*;
pub use device::*;
pub use lifecycle::*;
pub use tracker::*;
