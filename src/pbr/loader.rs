use std::{collections::HashMap, rc::Rc};

use tracing::error;

use crate::{
    host::{AssetStore, ImageCodec, SharedDevice},
    meta::{AssetPath, CompanionMapKind, DeviceTexture, KindMap, TextureType, TrackedTexture},
    utils::{CompanionLoadError, FailureClass, TsuyaError},
};

/// Receives the companion textures a loader produced.
pub trait CompanionSink {
    fn accept_normal(&mut self, texture: DeviceTexture);

    fn accept_specular(&mut self, texture: DeviceTexture);

    fn accept(&mut self, kind: CompanionMapKind, texture: DeviceTexture) {
        match kind {
            CompanionMapKind::Normal => self.accept_normal(texture),
            CompanionMapKind::Specular => self.accept_specular(texture),
        }
    }
}

/// Loads the companion textures of one host texture type.
pub trait CompanionLoader {
    fn load(
        &self,
        texture: &TrackedTexture,
        assets: &dyn AssetStore,
        sink: &mut dyn CompanionSink,
    ) -> Result<(), TsuyaError>;
}

/// Collects zero, one or two textures during a single load.
#[derive(Debug, Default)]
pub struct CompanionAccumulator {
    textures: KindMap<Option<DeviceTexture>>,
}

impl CompanionAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_textures(self) -> KindMap<Option<DeviceTexture>> {
        self.textures
    }
}

impl CompanionSink for CompanionAccumulator {
    fn accept_normal(&mut self, texture: DeviceTexture) {
        self.textures.normal = Some(texture);
    }

    fn accept_specular(&mut self, texture: DeviceTexture) {
        self.textures.specular = Some(texture);
    }
}

/// Maps host texture types to loader strategies.
#[derive(Default)]
pub struct LoaderRegistry {
    loaders: HashMap<TextureType, Box<dyn CompanionLoader>>,
}

impl LoaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with [`SimpleCompanionLoader`] serving [`TextureType::SIMPLE`].
    pub fn with_defaults(device: &SharedDevice, codec: Rc<dyn ImageCodec>) -> Self {
        let mut registry = Self::new();
        registry.register(
            TextureType::SIMPLE,
            SimpleCompanionLoader::new(device, codec),
        );
        registry
    }

    pub fn register(&mut self, texture_type: TextureType, loader: impl CompanionLoader + 'static) {
        self.loaders.insert(texture_type, Box::new(loader));
    }

    pub fn loader_for(&self, texture_type: &TextureType) -> Option<&dyn CompanionLoader> {
        self.loaders.get(texture_type).map(|loader| loader.as_ref())
    }
}

////////////////////////////////////////////////
/// SimpleCompanionLoader
/// * Companion textures for textures loaded from a single image asset.
/// * Reads `<location with suffix>` for each kind into its own device texture.
/// * Missing companion files are skipped silently; any other failure is
///   logged and that kind is skipped.
////////////////////////////////////////////////
pub struct SimpleCompanionLoader {
    device: SharedDevice,
    codec: Rc<dyn ImageCodec>,
}

impl SimpleCompanionLoader {
    pub fn new(device: &SharedDevice, codec: Rc<dyn ImageCodec>) -> Self {
        Self {
            device: Rc::clone(device),
            codec,
        }
    }

    fn load_kind(
        &self,
        assets: &dyn AssetStore,
        path: &AssetPath,
    ) -> Result<Option<DeviceTexture>, CompanionLoadError> {
        let mut resource = match assets.open(path) {
            Ok(resource) => resource,
            Err(TsuyaError::NotFound(_)) => return Ok(None),
            Err(err) => return Err(CompanionLoadError::new(path.clone(), err)),
        };

        let result = resource
            .read_to_end()
            .map_err(TsuyaError::from)
            .and_then(|bytes| self.codec.decode(&bytes))
            .and_then(|image| DeviceTexture::from_image(&self.device, path.as_str(), &image));

        match (result, resource.close()) {
            (Ok(texture), Ok(())) => Ok(Some(texture)),
            (Ok(texture), Err(close)) => {
                error!(resource = "companion", asset = %path, error = %close, "unable to close");
                Ok(Some(texture))
            }
            (Err(err), close) => {
                let mut err = CompanionLoadError::new(path.clone(), err);
                err.suppressed.extend(close.err());
                Err(err)
            }
        }
    }
}

impl CompanionLoader for SimpleCompanionLoader {
    fn load(
        &self,
        texture: &TrackedTexture,
        assets: &dyn AssetStore,
        sink: &mut dyn CompanionSink,
    ) -> Result<(), TsuyaError> {
        let Some(location) = &texture.location else {
            return Ok(());
        };

        for kind in CompanionMapKind::ALL {
            let path = location.with_suffix(kind.suffix());
            match self.load_kind(assets, &path) {
                Ok(Some(companion)) => sink.accept(kind, companion),
                Ok(None) => {}
                Err(err) if err.class() == FailureClass::MalformedMetadata => {
                    error!(resource = "companion", asset = %path, error = %err, "unable to parse metadata");
                }
                Err(err) => {
                    error!(resource = "companion", asset = %path, error = %err, "unable to load");
                }
            }
        }

        Ok(())
    }
}
