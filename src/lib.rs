pub mod defaults;
pub mod host;
pub mod meta;
pub mod parsing;
pub mod pbr;
pub mod utils;

use std::rc::Rc;

use tracing::info;

use host::*;
use meta::*;
use parsing::*;
use pbr::*;
use utils::*;

pub struct PbrInfo<'a> {
    pub device: &'a SharedDevice,
    /// Defaults to [`DefaultCodec`].
    pub codec: Option<Rc<dyn ImageCodec>>,
    pub layout_file: Option<&'a str>,
    /// Defaults to [`LoaderRegistry::with_defaults`].
    pub registry: Option<LoaderRegistry>,
}

////////////////////////////////////////////////
/// PbrSystem (Tsuya)
/// * Companion normal and specular maps for a host renderer.
///
/// * Owns the companion texture cache and the shared default textures.
/// ** Non-atlas textures get their companions through `get_or_load`, keyed by
///    texture identity and invalidated when the host deletes the texture.
/// ** Atlases get an [`AtlasAugmentation`] from `augment_atlas`, which the
///    host subscribes to the atlas's lifecycle events.
///
/// * Created by `init` at host startup and torn down by `shutdown`.
////////////////////////////////////////////////
pub struct PbrSystem {
    device: SharedDevice,
    codec: Rc<dyn ImageCodec>,
    layout: PbrLayoutFile,
    textures: CompanionTextureCache,
}

impl PbrSystem {
    pub fn init(info: PbrInfo<'_>) -> Result<Self, TsuyaError> {
        let layout = PbrLayoutFile::load(info.layout_file)?;
        let codec = info
            .codec
            .unwrap_or_else(|| Rc::new(DefaultCodec) as Rc<dyn ImageCodec>);
        let registry = info
            .registry
            .unwrap_or_else(|| LoaderRegistry::with_defaults(info.device, Rc::clone(&codec)));

        let textures = CompanionTextureCache::init(info.device, registry)?;
        info!(resource = "pbr", debug = layout.debug, animate = layout.animate, "initialized");

        Ok(Self {
            device: Rc::clone(info.device),
            codec,
            layout,
            textures,
        })
    }

    pub fn layout(&self) -> &PbrLayoutFile {
        &self.layout
    }

    pub fn textures(&self) -> &CompanionTextureCache {
        &self.textures
    }

    pub fn textures_mut(&mut self) -> &mut CompanionTextureCache {
        &mut self.textures
    }

    pub fn get_or_load(
        &mut self,
        id: TextureId,
        tracker: &dyn TextureTracker,
        assets: &dyn AssetStore,
    ) -> CompanionTextures<'_> {
        self.textures.get_or_load(id, tracker, assets)
    }

    /// The host deleted texture `id`.
    pub fn on_delete_texture(&mut self, id: TextureId) {
        self.textures.invalidate(id);
    }

    /// The host reloaded all resources.
    pub fn on_resources_reloaded(&mut self) {
        self.textures.clear();
    }

    /// Listener keeping companion atlases for the atlas `atlas_name`.
    pub fn augment_atlas(&self, atlas_name: impl Into<String>) -> AtlasAugmentation {
        AtlasAugmentation::new(
            atlas_name,
            &self.device,
            Rc::clone(&self.codec),
            self.layout.clone(),
        )
    }

    pub fn shutdown(self) {
        self.textures.shutdown();
        info!(resource = "pbr", "shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_and_shutdown_release_defaults() {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let system = PbrSystem::init(PbrInfo {
            device: &shared,
            codec: None,
            layout_file: None,
            registry: None,
        })
        .expect("init");

        assert_eq!(device.borrow().live_textures(), 2);
        assert!(system.textures().is_empty());
        assert!(system.layout().animate);

        system.shutdown();
        assert_eq!(device.borrow().live_textures(), 0);
    }

    #[test]
    fn missing_layout_file_fails_init() {
        let device = HeadlessDevice::shared();
        let shared: SharedDevice = device.clone();
        let result = PbrSystem::init(PbrInfo {
            device: &shared,
            codec: None,
            layout_file: Some("/nonexistent/pbr.json"),
            registry: None,
        });
        assert!(result.is_err());
        assert_eq!(device.borrow().live_textures(), 0);
    }
}
