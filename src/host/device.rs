use std::{cell::RefCell, collections::HashMap, fmt, rc::Rc};

use image::{RgbaImage, imageops};

use crate::utils::TsuyaError;

/// Identifier of a texture object on the device.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct GpuTextureId(pub u32);

impl fmt::Display for GpuTextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpu#{}", self.0)
    }
}

/// The GPU operations companion textures and atlases need from the host.
pub trait TextureDevice {
    /// Reserves a new texture id without storage.
    fn generate_id(&mut self) -> GpuTextureId;

    /// (Re)allocates storage for `id` with the given base size and level count.
    fn prepare_image(
        &mut self,
        id: GpuTextureId,
        width: u32,
        height: u32,
        mip_levels: u32,
    ) -> Result<(), TsuyaError>;

    /// Writes `image` into `id` at `level`, with its top-left corner at `(x, y)`.
    fn upload(
        &mut self,
        id: GpuTextureId,
        level: u32,
        x: u32,
        y: u32,
        image: &RgbaImage,
    ) -> Result<(), TsuyaError>;

    fn bind(&mut self, id: Option<GpuTextureId>);

    fn bound(&self) -> Option<GpuTextureId>;

    fn delete(&mut self, id: GpuTextureId);
}

pub type SharedDevice = Rc<RefCell<dyn TextureDevice>>;

////////////////////////////////////////////////
/// HeadlessDevice
/// * CPU-backed texture device for tooling and tests.
/// * Keeps every mip level of every live texture in memory and
///   records each id deletion, so it doubles as an allocation tracker.
////////////////////////////////////////////////
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    next_id: u32,
    images: HashMap<GpuTextureId, Vec<RgbaImage>>,
    bound: Option<GpuTextureId>,
    deleted: Vec<GpuTextureId>,
}

impl HeadlessDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Rc<RefCell<HeadlessDevice>> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Number of ids generated and not yet deleted.
    pub fn live_textures(&self) -> usize {
        self.images.len()
    }

    /// How many times `id` was deleted.
    pub fn delete_count(&self, id: GpuTextureId) -> usize {
        self.deleted.iter().filter(|deleted| **deleted == id).count()
    }

    pub fn is_live(&self, id: GpuTextureId) -> bool {
        self.images.contains_key(&id)
    }

    pub fn level(&self, id: GpuTextureId, level: u32) -> Option<&RgbaImage> {
        self.images.get(&id)?.get(level as usize)
    }

    pub fn dimensions(&self, id: GpuTextureId) -> Option<(u32, u32)> {
        self.level(id, 0).map(|image| image.dimensions())
    }

    pub fn mip_levels(&self, id: GpuTextureId) -> Option<u32> {
        self.images.get(&id).map(|levels| levels.len() as u32)
    }
}

impl TextureDevice for HeadlessDevice {
    fn generate_id(&mut self) -> GpuTextureId {
        self.next_id += 1;
        let id = GpuTextureId(self.next_id);
        self.images.insert(id, Vec::new());
        id
    }

    fn prepare_image(
        &mut self,
        id: GpuTextureId,
        width: u32,
        height: u32,
        mip_levels: u32,
    ) -> Result<(), TsuyaError> {
        let levels = self
            .images
            .get_mut(&id)
            .ok_or_else(|| TsuyaError::Device(format!("prepare on unknown texture {id}")))?;

        *levels = (0..mip_levels.max(1))
            .map(|level| RgbaImage::new((width >> level).max(1), (height >> level).max(1)))
            .collect();
        Ok(())
    }

    fn upload(
        &mut self,
        id: GpuTextureId,
        level: u32,
        x: u32,
        y: u32,
        image: &RgbaImage,
    ) -> Result<(), TsuyaError> {
        let target = self
            .images
            .get_mut(&id)
            .and_then(|levels| levels.get_mut(level as usize))
            .ok_or_else(|| {
                TsuyaError::Device(format!("upload to missing level {level} of {id}"))
            })?;

        let fits = x + image.width() <= target.width() && y + image.height() <= target.height();
        if !fits {
            return Err(TsuyaError::Device(format!(
                "{}x{} upload at ({x}, {y}) exceeds level {level} of {id}",
                image.width(),
                image.height()
            )));
        }

        imageops::replace(target, image, x as i64, y as i64);
        Ok(())
    }

    fn bind(&mut self, id: Option<GpuTextureId>) {
        self.bound = id;
    }

    fn bound(&self) -> Option<GpuTextureId> {
        self.bound
    }

    fn delete(&mut self, id: GpuTextureId) {
        self.images.remove(&id);
        self.deleted.push(id);
        if self.bound == Some(id) {
            self.bound = None;
        }
    }
}
