use crate::{meta::SpriteName, parsing::AnimationMetadata};

/// Logical description of a sprite: its name, frame size and animation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpriteInfo {
    pub name: SpriteName,
    pub width: u32,
    pub height: u32,
    pub animation: Option<AnimationMetadata>,
}

/// Where the host's packer put a sprite.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SpritePlacement {
    pub atlas_width: u32,
    pub atlas_height: u32,
    /// Highest mip level; the atlas has `max_level + 1` levels.
    pub max_level: u32,
    pub x: u32,
    pub y: u32,
}

/// Final atlas layout produced by a stitch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Preparations {
    pub width: u32,
    pub height: u32,
    pub max_level: u32,
}

impl Preparations {
    pub fn mip_levels(&self) -> u32 {
        self.max_level + 1
    }
}
