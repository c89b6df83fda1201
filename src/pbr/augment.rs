use std::{path::Path, rc::Rc};

use tracing::{debug, error};

use crate::{
    host::{AssetResource, AssetStore, AtlasLifecycleListener, ImageCodec, SharedDevice, SpriteLoadedEvent},
    meta::{AssetPath, CompanionMapKind, Preparations, SpriteInfo, SpritePlacement},
    parsing::{AnimationMetadata, PbrLayoutFile},
    pbr::{AtlasCompanionHolder, CompanionSprite},
    utils::{CompanionLoadError, FailureClass, TsuyaError},
};

////////////////////////////////////////////////
/// AtlasAugmentation
/// * Subscribes to one base atlas and keeps its companion atlases in step.
/// * Before loading: forgets the previous stitch's companion sprites.
/// * Per loaded sprite: looks up `<image location with suffix>` for every
///   companion kind and registers what it finds at the base sprite's place.
/// * On reload: resizes the companion atlases to the final layout.
/// * Animation ticks and teardown are forwarded once a holder exists.
////////////////////////////////////////////////
pub struct AtlasAugmentation {
    atlas_name: String,
    device: SharedDevice,
    codec: Rc<dyn ImageCodec>,
    layout: PbrLayoutFile,
    holder: Option<AtlasCompanionHolder>,
}

impl AtlasAugmentation {
    pub fn new(
        atlas_name: impl Into<String>,
        device: &SharedDevice,
        codec: Rc<dyn ImageCodec>,
        layout: PbrLayoutFile,
    ) -> Self {
        Self {
            atlas_name: atlas_name.into(),
            device: Rc::clone(device),
            codec,
            layout,
            holder: None,
        }
    }

    pub fn atlas_name(&self) -> &str {
        &self.atlas_name
    }

    /// `None` until the first companion sprite was found.
    pub fn holder(&self) -> Option<&AtlasCompanionHolder> {
        self.holder.as_ref()
    }

    fn read_sprite(
        &self,
        resource: &mut dyn AssetResource,
        info: &SpriteInfo,
        placement: SpritePlacement,
    ) -> Result<CompanionSprite, TsuyaError> {
        let bytes = resource.read_to_end()?;
        let (width, height) = self.codec.dimensions(&bytes)?;

        let animation = match resource.metadata() {
            Some(raw) => AnimationMetadata::parse(raw)?,
            None => None,
        };
        let (frame_width, frame_height) = self.codec.frame_size(animation.as_ref(), width, height)?;
        let image = self.codec.decode(&bytes)?;

        let companion = SpriteInfo {
            name: info.name.clone(),
            width: frame_width,
            height: frame_height,
            animation,
        };
        Ok(CompanionSprite::new(&companion, placement, image))
    }

    /// Reads the companion asset at `path` into a sprite placed like the
    /// base sprite. `Ok(None)` when the asset does not exist.
    pub fn load_companion_sprite(
        &self,
        assets: &dyn AssetStore,
        path: &AssetPath,
        info: &SpriteInfo,
        placement: SpritePlacement,
    ) -> Result<Option<CompanionSprite>, CompanionLoadError> {
        let mut resource = match assets.open(path) {
            Ok(resource) => resource,
            Err(TsuyaError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(CompanionLoadError::new(path.clone(), err)),
        };

        let result = self.read_sprite(resource.as_mut(), info, placement);

        match (result, resource.close()) {
            (Ok(sprite), Ok(())) => Ok(Some(sprite)),
            (Ok(sprite), Err(close)) => {
                error!(resource = "companion", asset = %path, error = %close, "unable to close");
                Ok(Some(sprite))
            }
            (Err(err), close) => {
                let mut err = CompanionLoadError::new(path.clone(), err);
                err.suppressed.extend(close.err());
                Err(err)
            }
        }
    }

    fn augment_sprite(&mut self, event: &mut SpriteLoadedEvent<'_>, kind: CompanionMapKind) {
        let path = event.image_location.with_suffix(kind.suffix());
        let info = SpriteInfo {
            name: event.info.name.with_suffix(kind.suffix()),
            ..event.info.clone()
        };

        let sprite = match self.load_companion_sprite(event.assets, &path, &info, event.placement) {
            Ok(Some(sprite)) => sprite,
            Ok(None) => return,
            Err(err) if err.class() == FailureClass::MalformedMetadata => {
                error!(resource = "companion", asset = %path, error = %err, "unable to parse metadata");
                return;
            }
            Err(err) => {
                error!(resource = "companion", asset = %path, error = %err, "unable to load");
                return;
            }
        };

        let Some(base) = event.sprite.as_deref_mut() else {
            return;
        };
        let name = sprite.name().clone();
        debug!(resource = "companion", sprite = %name, kind = %kind, x = sprite.x(), y = sprite.y());

        let holder = self
            .holder
            .get_or_insert_with(|| AtlasCompanionHolder::new(&self.device, self.atlas_name.clone()));
        holder.get_or_create(kind).add_sprite(sprite);
        base.companion_holder_or_create().set(kind, name);
    }

    fn dump(&self, holder: &AtlasCompanionHolder) {
        if let Err(err) = holder.dump(Path::new(&self.layout.dump_dir)) {
            error!(resource = "companion", atlas = %self.atlas_name, error = %err, "unable to dump companion atlases");
        }
    }
}

impl AtlasLifecycleListener for AtlasAugmentation {
    fn before_sprite_loading(&mut self) {
        if let Some(holder) = self.holder.as_mut() {
            holder.clear();
        }
    }

    fn on_sprite_loaded(&mut self, mut event: SpriteLoadedEvent<'_>) {
        if event.sprite.is_none() {
            return;
        }
        for kind in CompanionMapKind::ALL {
            self.augment_sprite(&mut event, kind);
        }
    }

    fn on_reload(&mut self, preparations: &Preparations) {
        let Some(holder) = self.holder.as_mut() else {
            return;
        };
        if let Err(err) = holder.reload(preparations) {
            error!(resource = "companion", atlas = %self.atlas_name, error = %err, "unable to reload companion atlases");
            return;
        }
        if self.layout.debug {
            if let Some(holder) = self.holder.as_ref() {
                self.dump(holder);
            }
        }
    }

    fn on_cycle_animation_frames(&mut self) {
        if let Some(holder) = self.holder.as_mut() {
            holder.cycle_animation_frames(self.layout.animate);
        }
    }

    fn on_release_id(&mut self) {
        if let Some(holder) = self.holder.as_mut() {
            holder.release_ids();
        }
    }

    fn on_close(&mut self) {
        if let Some(holder) = self.holder.take() {
            holder.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        host::{CompanionSpriteExtension, DefaultCodec, HeadlessDevice, MemoryAssetStore, encode_png},
        meta::SpriteName,
        pbr::SpriteCompanionHolder,
    };
    use image::{Rgba, RgbaImage};

    #[derive(Default)]
    struct Sprite {
        companions: Option<SpriteCompanionHolder>,
    }

    impl CompanionSpriteExtension for Sprite {
        fn companion_holder(&self) -> Option<&SpriteCompanionHolder> {
            self.companions.as_ref()
        }

        fn companion_holder_slot(&mut self) -> &mut Option<SpriteCompanionHolder> {
            &mut self.companions
        }
    }

    fn info(name: &str) -> SpriteInfo {
        SpriteInfo {
            name: SpriteName::new(name),
            width: 4,
            height: 4,
            animation: None,
        }
    }

    fn placement() -> SpritePlacement {
        SpritePlacement {
            atlas_width: 16,
            atlas_height: 16,
            max_level: 0,
            x: 4,
            y: 8,
        }
    }

    fn augmentation(device: &SharedDevice) -> AtlasAugmentation {
        AtlasAugmentation::new("blocks", device, Rc::new(DefaultCodec), PbrLayoutFile::default())
    }

    fn load(
        augmentation: &mut AtlasAugmentation,
        assets: &MemoryAssetStore,
        name: &str,
        sprite: Option<&mut Sprite>,
    ) {
        let info = info(name);
        let location = AssetPath::new(format!("textures/{name}.png"));
        augmentation.on_sprite_loaded(SpriteLoadedEvent {
            assets,
            info: &info,
            image_location: &location,
            placement: placement(),
            sprite: sprite.map(|s| s as &mut dyn CompanionSpriteExtension),
        });
    }

    #[test]
    fn missing_companions_create_nothing() {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let mut augmentation = augmentation(&shared);
        let assets = MemoryAssetStore::new();

        let mut sprite = Sprite::default();
        load(&mut augmentation, &assets, "stone", Some(&mut sprite));

        assert!(augmentation.holder().is_none());
        assert!(sprite.companion_holder().is_none());
    }

    #[test]
    fn failed_base_sprite_skips_lookup() {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let mut augmentation = augmentation(&shared);
        let mut assets = MemoryAssetStore::new();
        assets.insert("textures/stone_n.png", encode_png(&RgbaImage::new(4, 4)));

        load(&mut augmentation, &assets, "stone", None);
        assert!(augmentation.holder().is_none());
    }

    #[test]
    fn companion_sprite_shares_base_placement() {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let mut augmentation = augmentation(&shared);
        let mut assets = MemoryAssetStore::new();
        assets.insert(
            "textures/stone_s.png",
            encode_png(&RgbaImage::from_pixel(4, 4, Rgba([5, 6, 7, 8]))),
        );

        let mut sprite = Sprite::default();
        load(&mut augmentation, &assets, "stone", Some(&mut sprite));

        let companions = sprite.companion_holder().expect("holder");
        assert_eq!(companions.specular_sprite(), Some(&SpriteName::new("stone_s")));
        assert!(companions.normal_sprite().is_none());

        let holder = augmentation.holder().expect("atlas holder");
        let companion = holder
            .sprite_for(companions, CompanionMapKind::Specular)
            .expect("registered");
        assert_eq!(companion.placement(), &placement());
        assert_eq!((companion.width(), companion.height()), (4, 4));
        assert!(holder.atlas(CompanionMapKind::Normal).is_none());
        assert_eq!(assets.open_resources(), 0);
    }

    #[test]
    fn bad_metadata_is_classified() {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let augmentation = augmentation(&shared);
        let mut assets = MemoryAssetStore::new();
        assets.insert_with_metadata(
            "textures/lava_n.png",
            encode_png(&RgbaImage::new(4, 6)),
            br#"{"animation": {"width": 4, "height": 4}}"#.to_vec(),
        );
        assets.fail_closes("textures/lava_n.png");

        let err = augmentation
            .load_companion_sprite(&assets, &AssetPath::new("textures/lava_n.png"), &info("lava_n"), placement())
            .expect_err("frame size does not divide");
        assert_eq!(err.class(), FailureClass::MalformedMetadata);
        assert_eq!(err.suppressed.len(), 1);
        assert_eq!(assets.open_resources(), 0);
    }

    #[test]
    fn close_failure_after_success_keeps_sprite() {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let augmentation = augmentation(&shared);
        let mut assets = MemoryAssetStore::new();
        assets.insert("textures/ore_n.png", encode_png(&RgbaImage::new(4, 4)));
        assets.fail_closes("textures/ore_n.png");

        let sprite = augmentation
            .load_companion_sprite(&assets, &AssetPath::new("textures/ore_n.png"), &info("ore_n"), placement())
            .expect("loaded");
        assert!(sprite.is_some());
    }

    #[test]
    fn disabled_animation_keeps_ticking_without_uploads() {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let layout = PbrLayoutFile {
            animate: false,
            ..Default::default()
        };
        let mut augmentation = AtlasAugmentation::new("blocks", &shared, Rc::new(DefaultCodec), layout);
        let red = Rgba([255, 0, 0, 255]);
        let frames = RgbaImage::from_fn(4, 8, |_, y| if y < 4 { red } else { Rgba([0, 0, 255, 255]) });
        let mut assets = MemoryAssetStore::new();
        assets.insert_with_metadata(
            "textures/water_n.png",
            encode_png(&frames),
            br#"{"animation": {}}"#.to_vec(),
        );

        let mut sprite = Sprite::default();
        load(&mut augmentation, &assets, "water", Some(&mut sprite));
        augmentation.on_reload(&Preparations {
            width: 16,
            height: 16,
            max_level: 0,
        });
        augmentation.on_cycle_animation_frames();

        let holder = augmentation.holder().unwrap();
        let companions = sprite.companion_holder().unwrap();
        let water = holder.sprite_for(companions, CompanionMapKind::Normal).unwrap();
        assert_eq!(water.animation().unwrap().frame(), 1);
        assert_eq!(water.animation().unwrap().sub_frame(), 0);

        let id = holder.atlas(CompanionMapKind::Normal).unwrap().texture().gpu_id().unwrap();
        assert_eq!(device.borrow().level(id, 0).unwrap().get_pixel(4, 8), &red);
    }

    #[test]
    fn read_failure_is_decode_or_io() {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let augmentation = augmentation(&shared);
        let mut assets = MemoryAssetStore::new();
        assets.insert("textures/ore_s.png", encode_png(&RgbaImage::new(4, 4)));
        assets.fail_reads("textures/ore_s.png");

        let err = augmentation
            .load_companion_sprite(&assets, &AssetPath::new("textures/ore_s.png"), &info("ore_s"), placement())
            .expect_err("read fails");
        assert_eq!(err.class(), FailureClass::DecodeOrIo);
        assert!(err.suppressed.is_empty());
        assert_eq!(assets.open_resources(), 0);
    }

    #[test]
    fn close_frees_holder() {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let mut augmentation = augmentation(&shared);
        let mut assets = MemoryAssetStore::new();
        assets.insert("textures/stone_n.png", encode_png(&RgbaImage::new(4, 4)));

        let mut sprite = Sprite::default();
        load(&mut augmentation, &assets, "stone", Some(&mut sprite));
        augmentation.on_reload(&Preparations {
            width: 16,
            height: 16,
            max_level: 0,
        });
        assert_eq!(device.borrow().live_textures(), 1);

        augmentation.on_close();
        assert!(augmentation.holder().is_none());
        assert_eq!(device.borrow().live_textures(), 0);

        augmentation.on_release_id();
        augmentation.on_cycle_animation_frames();
    }
}
