use std::{borrow::Cow, fmt, rc::Rc};

use image::RgbaImage;

use crate::{
    host::{GpuTextureId, SharedDevice},
    meta::AssetPath,
    utils::TsuyaError,
};

/// Opaque identity of a host texture, used as the companion cache key.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "texture#{}", self.0)
    }
}

/// Tag describing what kind of host texture an id refers to. Loader
/// strategies are registered per tag.
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct TextureType(Cow<'static, str>);

impl TextureType {
    /// A texture loaded from a single image asset.
    pub const SIMPLE: TextureType = TextureType::new("simple");
    /// A stitched sprite atlas.
    pub const ATLAS: TextureType = TextureType::new("atlas");
    /// A texture whose pixels are produced at runtime.
    pub const DYNAMIC: TextureType = TextureType::new("dynamic");

    pub const fn new(tag: &'static str) -> Self {
        Self(Cow::Borrowed(tag))
    }

    pub fn custom(tag: impl Into<String>) -> Self {
        Self(Cow::Owned(tag.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// What the texture tracker knows about a live host texture.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackedTexture {
    pub id: TextureId,
    pub texture_type: TextureType,
    /// Asset the texture was loaded from, if any.
    pub location: Option<AssetPath>,
}

////////////////////////////////////////////////
/// DeviceTexture
/// * A texture object on the shared device.
/// * The device id is released exactly once: by `release_id`, by `close`,
///   or when the value is dropped, whichever comes first.
/// * After `release_id` the next `prepare` allocates a fresh id.
////////////////////////////////////////////////
pub struct DeviceTexture {
    label: String,
    device: SharedDevice,
    id: Option<GpuTextureId>,
    width: u32,
    height: u32,
    mip_levels: u32,
}

impl fmt::Debug for DeviceTexture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceTexture")
            .field("label", &self.label)
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("mip_levels", &self.mip_levels)
            .finish()
    }
}

impl DeviceTexture {
    /// Creates a texture with no id and no storage yet.
    pub fn new(device: &SharedDevice, label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            device: Rc::clone(device),
            id: None,
            width: 0,
            height: 0,
            mip_levels: 0,
        }
    }

    /// Creates a single-level texture holding `image`.
    pub fn from_image(
        device: &SharedDevice,
        label: impl Into<String>,
        image: &RgbaImage,
    ) -> Result<Self, TsuyaError> {
        let mut texture = Self::new(device, label);
        texture.prepare(image.width(), image.height(), 1)?;
        texture.upload(0, 0, 0, image)?;
        Ok(texture)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn gpu_id(&self) -> Option<GpuTextureId> {
        self.id
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// (Re)allocates storage, generating an id first if needed.
    pub fn prepare(&mut self, width: u32, height: u32, mip_levels: u32) -> Result<(), TsuyaError> {
        let mut device = self.device.borrow_mut();
        let id = *self.id.get_or_insert_with(|| device.generate_id());
        device.bind(Some(id));
        device.prepare_image(id, width, height, mip_levels)?;

        self.width = width;
        self.height = height;
        self.mip_levels = mip_levels;
        Ok(())
    }

    pub fn upload(&self, level: u32, x: u32, y: u32, image: &RgbaImage) -> Result<(), TsuyaError> {
        let id = self.id.ok_or_else(|| {
            TsuyaError::Device(format!("upload to released texture {}", self.label))
        })?;
        self.device.borrow_mut().upload(id, level, x, y, image)
    }

    pub fn bind(&self) {
        self.device.borrow_mut().bind(self.id);
    }

    pub fn release_id(&mut self) {
        if let Some(id) = self.id.take() {
            self.device.borrow_mut().delete(id);
        }
    }

    pub fn close(mut self) {
        self.release_id();
    }
}

impl Drop for DeviceTexture {
    fn drop(&mut self) {
        self.release_id();
    }
}
