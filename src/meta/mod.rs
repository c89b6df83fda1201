pub mod atlases;
pub mod kinds;
pub mod names;
pub mod textures;

pub use atlases::*;
pub use kinds::*;
pub use names::*;
pub use textures::*;
