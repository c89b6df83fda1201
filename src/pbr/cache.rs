use tracing::debug;

use crate::{
    defaults::CompanionMapDefaults,
    host::{AssetStore, SharedDevice, TextureTracker},
    meta::{CompanionMapKind, DeviceTexture, KindMap, TextureId},
    pbr::{CompanionAccumulator, LoaderRegistry},
    utils::{DataCache, TsuyaError},
};

/// Cached companion textures of one texture identity.
#[derive(Debug)]
pub enum CompanionTextureHolder {
    /// Nothing was produced; both kinds resolve to the shared defaults.
    Default,
    /// At least one kind was produced. Missing kinds resolve to the defaults.
    Resolved(KindMap<Option<DeviceTexture>>),
}

impl CompanionTextureHolder {
    fn from_accumulated(textures: KindMap<Option<DeviceTexture>>) -> Self {
        if textures.is_empty() {
            CompanionTextureHolder::Default
        } else {
            CompanionTextureHolder::Resolved(textures)
        }
    }

    fn close(self) {
        if let CompanionTextureHolder::Resolved(textures) = self {
            for (_, texture) in textures.into_entries() {
                if let Some(texture) = texture {
                    texture.close();
                }
            }
        }
    }
}

/// Borrowed view of the companion textures for one identity, with defaults
/// already substituted.
#[derive(Debug, Clone, Copy)]
pub struct CompanionTextures<'a> {
    textures: KindMap<&'a DeviceTexture>,
    defaulted: KindMap<bool>,
}

impl<'a> CompanionTextures<'a> {
    pub fn texture(&self, kind: CompanionMapKind) -> &'a DeviceTexture {
        self.textures.get(kind)
    }

    pub fn normal(&self) -> &'a DeviceTexture {
        self.textures.normal
    }

    pub fn specular(&self) -> &'a DeviceTexture {
        self.textures.specular
    }

    /// Whether `kind` fell back to the shared default texture.
    pub fn is_default(&self, kind: CompanionMapKind) -> bool {
        *self.defaulted.get(kind)
    }

    /// Whether both kinds are the shared defaults.
    pub fn is_default_holder(&self) -> bool {
        self.defaulted.normal && self.defaulted.specular
    }
}

////////////////////////////////////////////////
/// CompanionTextureCache
/// * Maps texture identities to their companion (normal, specular) textures.
/// * Populated lazily through the loader registry; every miss, including
///   loader failures, is cached as the default holder and not retried until
///   the identity is invalidated.
/// * Owns and closes every texture a loader produced. The defaults are
///   closed only by `shutdown`.
////////////////////////////////////////////////
pub struct CompanionTextureCache {
    holders: DataCache<TextureId, CompanionTextureHolder>,
    registry: LoaderRegistry,
    defaults: CompanionMapDefaults,
}

impl CompanionTextureCache {
    /// Creates the default textures on `device` and an empty cache.
    pub fn init(device: &SharedDevice, registry: LoaderRegistry) -> Result<Self, TsuyaError> {
        Ok(Self {
            holders: DataCache::new(),
            registry,
            defaults: CompanionMapDefaults::create(device)?,
        })
    }

    pub fn defaults(&self) -> &CompanionMapDefaults {
        &self.defaults
    }

    pub fn registry_mut(&mut self) -> &mut LoaderRegistry {
        &mut self.registry
    }

    /// Number of cached identities, default holders included.
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    pub fn is_cached(&self, id: TextureId) -> bool {
        self.holders.contains(&id)
    }

    fn view<'a>(
        defaults: &'a CompanionMapDefaults,
        holder: Option<&'a CompanionTextureHolder>,
    ) -> CompanionTextures<'a> {
        let resolved = match holder {
            Some(CompanionTextureHolder::Resolved(textures)) => Some(textures),
            _ => None,
        };

        let pick = |kind: CompanionMapKind| {
            resolved
                .and_then(|textures| textures.get(kind).as_ref())
                .ok_or_else(|| defaults.texture(kind))
        };

        let normal = pick(CompanionMapKind::Normal);
        let specular = pick(CompanionMapKind::Specular);
        CompanionTextures {
            defaulted: KindMap::new(normal.is_err(), specular.is_err()),
            textures: KindMap::new(
                normal.unwrap_or_else(|default| default),
                specular.unwrap_or_else(|default| default),
            ),
        }
    }

    /// Cached companions for `id`, or the defaults. Never loads.
    pub fn get(&self, id: TextureId) -> CompanionTextures<'_> {
        Self::view(&self.defaults, self.holders.get(&id))
    }

    /// Cached companions for `id`, loading them on first request.
    pub fn get_or_load(
        &mut self,
        id: TextureId,
        tracker: &dyn TextureTracker,
        assets: &dyn AssetStore,
    ) -> CompanionTextures<'_> {
        if !self.holders.contains(&id) {
            let holder = self.load_holder(id, tracker, assets);
            self.holders.get_or_insert_with(id, || holder);
        }
        self.get(id)
    }

    fn load_holder(
        &self,
        id: TextureId,
        tracker: &dyn TextureTracker,
        assets: &dyn AssetStore,
    ) -> CompanionTextureHolder {
        let Some(texture) = tracker.resolve(id) else {
            return CompanionTextureHolder::Default;
        };
        let Some(loader) = self.registry.loader_for(&texture.texture_type) else {
            return CompanionTextureHolder::Default;
        };

        let mut accumulator = CompanionAccumulator::new();
        match loader.load(&texture, assets, &mut accumulator) {
            Ok(()) => {
                debug!(resource = "companion", texture = %id, source = "loader");
                CompanionTextureHolder::from_accumulated(accumulator.into_textures())
            }
            Err(err) => {
                // Anything accepted before the failure is released with the accumulator.
                debug!(resource = "companion", texture = %id, error = %err, "failed to load companion textures");
                CompanionTextureHolder::Default
            }
        }
    }

    /// Drops the entry for `id`, closing what it owned. Call when the base
    /// texture is deleted.
    pub fn invalidate(&mut self, id: TextureId) {
        if let Some(holder) = self.holders.remove(&id) {
            holder.close();
        }
    }

    /// Drops every entry, e.g. on a full resource reload.
    pub fn clear(&mut self) {
        for (_, holder) in self.holders.drain() {
            holder.close();
        }
    }

    /// Clears the cache and releases the default textures.
    pub fn shutdown(mut self) {
        self.clear();
        let Self { defaults, .. } = self;
        defaults.close();
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use super::*;
    use crate::{
        host::{GpuTextureId, HeadlessDevice, MemoryAssetStore, TextureRegistry},
        meta::{TextureType, TrackedTexture},
        pbr::{CompanionLoader, CompanionSink},
    };
    use image::{Rgba, RgbaImage};

    const TEXTURE: TextureId = TextureId(42);

    /// Produces a fixed set of kinds and counts its invocations.
    struct FixedLoader {
        device: SharedDevice,
        kinds: Vec<CompanionMapKind>,
        fail_after_accept: bool,
        calls: Rc<Cell<usize>>,
    }

    impl CompanionLoader for FixedLoader {
        fn load(
            &self,
            _texture: &TrackedTexture,
            _assets: &dyn AssetStore,
            sink: &mut dyn CompanionSink,
        ) -> Result<(), TsuyaError> {
            self.calls.set(self.calls.get() + 1);
            for kind in &self.kinds {
                let image = RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 4]));
                sink.accept(*kind, DeviceTexture::from_image(&self.device, "fixed", &image)?);
            }
            if self.fail_after_accept {
                return Err(TsuyaError::Loader("exploded".into()));
            }
            Ok(())
        }
    }

    struct Fixture {
        device: Rc<std::cell::RefCell<HeadlessDevice>>,
        cache: CompanionTextureCache,
        tracker: TextureRegistry,
        assets: MemoryAssetStore,
        calls: Rc<Cell<usize>>,
    }

    fn fixture(kinds: Vec<CompanionMapKind>, fail_after_accept: bool) -> Fixture {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let calls = Rc::new(Cell::new(0));

        let mut registry = LoaderRegistry::new();
        registry.register(
            TextureType::custom("fixed"),
            FixedLoader {
                device: shared.clone(),
                kinds,
                fail_after_accept,
                calls: calls.clone(),
            },
        );

        let mut tracker = TextureRegistry::new();
        tracker.track(TrackedTexture {
            id: TEXTURE,
            texture_type: TextureType::custom("fixed"),
            location: None,
        });

        Fixture {
            device,
            cache: CompanionTextureCache::init(&shared, registry).expect("init"),
            tracker,
            assets: MemoryAssetStore::new(),
            calls,
        }
    }

    fn default_ids(cache: &CompanionTextureCache) -> KindMap<Option<GpuTextureId>> {
        KindMap::from_fn(|kind| cache.defaults().texture(kind).gpu_id())
    }

    #[test]
    fn unknown_identity_gets_defaults() {
        let mut f = fixture(Vec::new(), false);
        let defaults = default_ids(&f.cache);

        let view = f.cache.get(TextureId(7));
        assert!(view.is_default_holder());
        assert_eq!(view.normal().gpu_id(), defaults.normal);
        assert!(!f.cache.is_cached(TextureId(7)));

        let view = f.cache.get_or_load(TextureId(7), &f.tracker, &f.assets);
        assert!(view.is_default_holder());
        assert_eq!(view.specular().gpu_id(), defaults.specular);
    }

    #[test]
    fn untracked_type_gets_defaults() {
        let mut f = fixture(Vec::new(), false);
        f.tracker.track(TrackedTexture {
            id: TextureId(8),
            texture_type: TextureType::DYNAMIC,
            location: None,
        });

        assert!(f.cache.get_or_load(TextureId(8), &f.tracker, &f.assets).is_default_holder());
        assert_eq!(f.calls.get(), 0);
    }

    #[test]
    fn loaders_registered_after_init_are_used() {
        let mut f = fixture(Vec::new(), false);
        let shared: SharedDevice = f.device.clone();
        let calls = Rc::new(Cell::new(0));
        f.cache.registry_mut().register(
            TextureType::DYNAMIC,
            FixedLoader {
                device: shared,
                kinds: vec![CompanionMapKind::Normal],
                fail_after_accept: false,
                calls: calls.clone(),
            },
        );
        f.tracker.track(TrackedTexture {
            id: TextureId(8),
            texture_type: TextureType::DYNAMIC,
            location: None,
        });

        let view = f.cache.get_or_load(TextureId(8), &f.tracker, &f.assets);
        assert!(!view.is_default(CompanionMapKind::Normal));
        assert_eq!(calls.get(), 1);
        assert_eq!(f.calls.get(), 0);
    }

    #[test]
    fn empty_result_is_cached_and_not_retried() {
        let mut f = fixture(Vec::new(), false);

        for _ in 0..3 {
            let view = f.cache.get_or_load(TEXTURE, &f.tracker, &f.assets);
            assert!(view.is_default_holder());
        }
        assert_eq!(f.calls.get(), 1);
        assert!(f.cache.is_cached(TEXTURE));
    }

    #[test]
    fn single_kind_is_filled_with_default() {
        let mut f = fixture(vec![CompanionMapKind::Specular], false);
        let defaults = default_ids(&f.cache);

        let view = f.cache.get_or_load(TEXTURE, &f.tracker, &f.assets);
        assert!(view.is_default(CompanionMapKind::Normal));
        assert!(!view.is_default(CompanionMapKind::Specular));
        assert_eq!(view.normal().gpu_id(), defaults.normal);
        assert_ne!(view.specular().gpu_id(), defaults.specular);
        assert_eq!(view.specular().label(), "fixed");

        assert!(!f.cache.get(TEXTURE).is_default(CompanionMapKind::Specular));
        assert_eq!(f.calls.get(), 1);
    }

    #[test]
    fn loader_failure_falls_back_and_releases_partial_results() {
        let mut f = fixture(vec![CompanionMapKind::Normal], true);

        assert!(f.cache.get_or_load(TEXTURE, &f.tracker, &f.assets).is_default_holder());
        assert!(f.cache.get_or_load(TEXTURE, &f.tracker, &f.assets).is_default_holder());
        assert_eq!(f.calls.get(), 1);
        // Only the two defaults remain.
        assert_eq!(f.device.borrow().live_textures(), 2);
    }

    #[test]
    fn invalidate_releases_exactly_once() {
        let mut f = fixture(vec![CompanionMapKind::Normal, CompanionMapKind::Specular], false);

        let view = f.cache.get_or_load(TEXTURE, &f.tracker, &f.assets);
        let owned = [view.normal().gpu_id().unwrap(), view.specular().gpu_id().unwrap()];
        assert_eq!(f.device.borrow().live_textures(), 4);

        f.cache.invalidate(TEXTURE);
        f.cache.invalidate(TEXTURE);

        assert!(f.cache.get(TEXTURE).is_default_holder());
        for id in owned {
            assert_eq!(f.device.borrow().delete_count(id), 1);
        }
        assert_eq!(f.device.borrow().live_textures(), 2);

        // A fresh request loads again.
        f.cache.get_or_load(TEXTURE, &f.tracker, &f.assets);
        assert_eq!(f.calls.get(), 2);
    }

    #[test]
    fn invalidating_default_holder_leaves_defaults_alive() {
        let mut f = fixture(Vec::new(), false);
        let defaults = default_ids(&f.cache);

        f.cache.get_or_load(TEXTURE, &f.tracker, &f.assets);
        f.cache.invalidate(TEXTURE);

        assert!(f.device.borrow().is_live(defaults.normal.unwrap()));
        assert!(f.device.borrow().is_live(defaults.specular.unwrap()));
    }

    #[test]
    fn clear_then_shutdown_frees_everything() {
        let mut f = fixture(vec![CompanionMapKind::Normal], false);
        f.tracker.track(TrackedTexture {
            id: TextureId(43),
            texture_type: TextureType::custom("fixed"),
            location: None,
        });

        f.cache.get_or_load(TEXTURE, &f.tracker, &f.assets);
        f.cache.get_or_load(TextureId(43), &f.tracker, &f.assets);
        f.cache.get_or_load(TextureId(99), &f.tracker, &f.assets);
        assert_eq!(f.device.borrow().live_textures(), 4);

        f.cache.clear();
        assert!(f.cache.is_empty());
        assert_eq!(f.device.borrow().live_textures(), 2);

        f.cache.shutdown();
        assert_eq!(f.device.borrow().live_textures(), 0);
    }
}
