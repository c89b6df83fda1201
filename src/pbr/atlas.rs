use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    rc::Rc,
};

use image::{RgbaImage, imageops};
use tracing::{debug, error, info};

use crate::{
    host::SharedDevice,
    meta::{CompanionMapKind, DeviceTexture, KindMap, Preparations, SpriteName},
    pbr::{CompanionSprite, SpriteCompanionHolder},
    utils::TsuyaError,
};

/// File-name friendly form of an atlas name.
pub fn atlas_slug(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

////////////////////////////////////////////////
/// CompanionAtlas
/// * Secondary atlas of one companion kind. Sprites sit at the same
///   coordinates as their base sprites, so the layout mirrors the base atlas.
/// * Sprites are registered during a stitch and uploaded on `reload`.
////////////////////////////////////////////////
#[derive(Debug)]
pub struct CompanionAtlas {
    kind: CompanionMapKind,
    texture: DeviceTexture,
    sprites: HashMap<SpriteName, CompanionSprite>,
}

impl CompanionAtlas {
    pub fn new(device: &SharedDevice, atlas_name: &str, kind: CompanionMapKind) -> Self {
        Self {
            kind,
            texture: DeviceTexture::new(device, format!("{atlas_name}{}", kind.suffix())),
            sprites: HashMap::new(),
        }
    }

    pub fn kind(&self) -> CompanionMapKind {
        self.kind
    }

    pub fn texture(&self) -> &DeviceTexture {
        &self.texture
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.texture.dimensions()
    }

    pub fn add_sprite(&mut self, sprite: CompanionSprite) {
        self.sprites.insert(sprite.name().clone(), sprite);
    }

    pub fn sprite(&self, name: &SpriteName) -> Option<&CompanionSprite> {
        self.sprites.get(name)
    }

    pub fn sprites(&self) -> impl Iterator<Item = &CompanionSprite> {
        self.sprites.values()
    }

    pub fn sprite_count(&self) -> usize {
        self.sprites.len()
    }

    pub fn clear(&mut self) {
        self.sprites.clear();
    }

    /// Resizes to the final stitch layout and uploads every sprite.
    pub fn reload(&mut self, preparations: &Preparations) -> Result<(), TsuyaError> {
        self.texture
            .prepare(preparations.width, preparations.height, preparations.mip_levels())?;

        for sprite in self.sprites.values() {
            if let Err(err) = sprite.upload_first_frame(&self.texture) {
                error!(resource = "companion", sprite = %sprite.name(), error = %err, "unable to upload sprite");
            }
        }

        info!(
            resource = "companion",
            atlas = %self.texture.label(),
            width = preparations.width,
            height = preparations.height,
            mip_levels = preparations.mip_levels(),
            sprites = self.sprites.len(),
            "reloaded companion atlas"
        );
        Ok(())
    }

    /// One animation tick for every animated sprite. Frames are uploaded
    /// only when `upload` is set and the atlas holds a GPU id.
    pub fn cycle_animation_frames(&mut self, upload: bool) {
        let texture = (upload && self.texture.gpu_id().is_some()).then_some(&self.texture);
        if let Some(texture) = texture {
            texture.bind();
        }

        for sprite in self.sprites.values_mut().filter(|sprite| sprite.is_animated()) {
            if let Err(err) = sprite.cycle_frames(texture) {
                error!(resource = "companion", sprite = %sprite.name(), error = %err, "unable to upload animation frame");
            }
        }
    }

    pub fn release_id(&mut self) {
        self.texture.release_id();
    }

    pub fn close(self) {
        self.texture.close();
    }

    /// Level 0 of the atlas as currently shown, composed from its sprites.
    pub fn compose(&self) -> RgbaImage {
        let (width, height) = self.dimensions();
        let mut canvas = RgbaImage::new(width, height);
        for sprite in self.sprites.values() {
            if let Some(frame) = sprite.current_frame(0) {
                imageops::replace(&mut canvas, &frame, sprite.x() as i64, sprite.y() as i64);
            }
        }
        canvas
    }
}

////////////////////////////////////////////////
/// AtlasCompanionHolder
/// * The companion atlases of one base atlas, created lazily per kind on
///   the first companion sprite of that kind.
/// * Follows the base atlas through stitch, reload, animation and teardown.
////////////////////////////////////////////////
pub struct AtlasCompanionHolder {
    atlas_name: String,
    device: SharedDevice,
    atlases: KindMap<Option<CompanionAtlas>>,
}

impl AtlasCompanionHolder {
    pub fn new(device: &SharedDevice, atlas_name: impl Into<String>) -> Self {
        Self {
            atlas_name: atlas_name.into(),
            device: Rc::clone(device),
            atlases: KindMap::default(),
        }
    }

    pub fn atlas_name(&self) -> &str {
        &self.atlas_name
    }

    pub fn atlas(&self, kind: CompanionMapKind) -> Option<&CompanionAtlas> {
        self.atlases.get(kind).as_ref()
    }

    pub fn get_or_create(&mut self, kind: CompanionMapKind) -> &mut CompanionAtlas {
        let (device, name) = (&self.device, &self.atlas_name);
        self.atlases.get_mut(kind).get_or_insert_with(|| {
            debug!(resource = "companion", atlas = %name, kind = %kind, "created companion atlas");
            CompanionAtlas::new(device, name, kind)
        })
    }

    /// The companion sprite of `kind` a base sprite's holder refers to.
    pub fn sprite_for(
        &self,
        holder: &SpriteCompanionHolder,
        kind: CompanionMapKind,
    ) -> Option<&CompanionSprite> {
        let name = holder.get(kind)?;
        self.atlas(kind)?.sprite(name)
    }

    fn present_mut(&mut self) -> impl Iterator<Item = &mut CompanionAtlas> {
        [&mut self.atlases.normal, &mut self.atlases.specular]
            .into_iter()
            .filter_map(Option::as_mut)
    }

    /// Forgets every registered sprite; the atlases keep their size until
    /// the next reload.
    pub fn clear(&mut self) {
        for atlas in self.present_mut() {
            atlas.clear();
        }
    }

    /// Resizes every atlas and restores whatever texture was bound before.
    pub fn reload(&mut self, preparations: &Preparations) -> Result<(), TsuyaError> {
        let previous = self.device.borrow().bound();
        let result = self
            .present_mut()
            .try_for_each(|atlas| atlas.reload(preparations));
        self.device.borrow_mut().bind(previous);
        result
    }

    /// Ticks every atlas; see [`CompanionAtlas::cycle_animation_frames`].
    pub fn cycle_animation_frames(&mut self, upload: bool) {
        let previous = self.device.borrow().bound();
        for atlas in self.present_mut() {
            atlas.cycle_animation_frames(upload);
        }
        self.device.borrow_mut().bind(previous);
    }

    /// Frees the GPU ids only; a later reload allocates new ones.
    pub fn release_ids(&mut self) {
        for atlas in self.present_mut() {
            atlas.release_id();
        }
    }

    pub fn close(self) {
        for (_, atlas) in self.atlases.into_entries() {
            if let Some(atlas) = atlas {
                atlas.close();
            }
        }
    }

    /// Writes every atlas as `<dir>/<atlas slug><suffix>.png`.
    pub fn dump(&self, dir: &Path) -> Result<Vec<PathBuf>, TsuyaError> {
        fs::create_dir_all(dir)?;

        let slug = atlas_slug(&self.atlas_name);
        let mut written = Vec::new();
        for (kind, atlas) in self.atlases.iter() {
            let Some(atlas) = atlas else { continue };
            let path = dir.join(format!("{slug}{}.png", kind.suffix()));
            atlas.compose().save(&path)?;
            debug!(resource = "companion", path = %path.display(), "dumped companion atlas");
            written.push(path);
        }
        Ok(written)
    }
}
