use image::RgbaImage;
use tracing::debug;

use crate::{
    host::SharedDevice,
    meta::{CompanionMapKind, DeviceTexture, KindMap},
    utils::TsuyaError,
};

pub const DEFAULT_NORMAL_LABEL: &str = "companion/default_normal";
pub const DEFAULT_SPECULAR_LABEL: &str = "companion/default_specular";

pub fn default_label(kind: CompanionMapKind) -> &'static str {
    match kind {
        CompanionMapKind::Normal => DEFAULT_NORMAL_LABEL,
        CompanionMapKind::Specular => DEFAULT_SPECULAR_LABEL,
    }
}

/// 1x1 image holding the "no effect" value for `kind`.
pub fn default_image(kind: CompanionMapKind) -> RgbaImage {
    RgbaImage::from_pixel(1, 1, kind.default_pixel())
}

/// The two fallback textures served whenever a texture or sprite has no
/// companion map of its own. Owned by nobody else.
#[derive(Debug)]
pub struct CompanionMapDefaults {
    textures: KindMap<DeviceTexture>,
}

impl CompanionMapDefaults {
    pub fn create(device: &SharedDevice) -> Result<Self, TsuyaError> {
        let normal = DeviceTexture::from_image(
            device,
            DEFAULT_NORMAL_LABEL,
            &default_image(CompanionMapKind::Normal),
        )?;
        let specular = DeviceTexture::from_image(
            device,
            DEFAULT_SPECULAR_LABEL,
            &default_image(CompanionMapKind::Specular),
        )?;
        debug!(resource = "companion", source = "default", "created default companion textures");

        Ok(Self {
            textures: KindMap::new(normal, specular),
        })
    }

    pub fn texture(&self, kind: CompanionMapKind) -> &DeviceTexture {
        self.textures.get(kind)
    }

    pub fn close(self) {
        for (_, texture) in self.textures.into_entries() {
            texture.close();
        }
    }
}
