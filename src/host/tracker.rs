use std::collections::HashMap;

use crate::meta::{TextureId, TrackedTexture};

/// Resolves texture identities to what the host knows about them.
pub trait TextureTracker {
    fn resolve(&self, id: TextureId) -> Option<TrackedTexture>;
}

/// A [`TextureTracker`] backed by a plain map, for hosts that register
/// textures as they create them.
#[derive(Debug, Default)]
pub struct TextureRegistry {
    textures: HashMap<TextureId, TrackedTexture>,
}

impl TextureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn track(&mut self, texture: TrackedTexture) {
        self.textures.insert(texture.id, texture);
    }

    pub fn untrack(&mut self, id: TextureId) -> Option<TrackedTexture> {
        self.textures.remove(&id)
    }
}

impl TextureTracker for TextureRegistry {
    fn resolve(&self, id: TextureId) -> Option<TrackedTexture> {
        self.textures.get(&id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{AssetPath, TextureType};

    #[test]
    fn untracked_textures_no_longer_resolve() {
        let mut registry = TextureRegistry::new();
        registry.track(TrackedTexture {
            id: TextureId(3),
            texture_type: TextureType::SIMPLE,
            location: Some(AssetPath::new("textures/gui/logo.png")),
        });
        assert_eq!(registry.resolve(TextureId(3)).map(|t| t.texture_type), Some(TextureType::SIMPLE));

        let removed = registry.untrack(TextureId(3)).expect("tracked");
        assert_eq!(removed.location, Some(AssetPath::new("textures/gui/logo.png")));
        assert!(registry.resolve(TextureId(3)).is_none());
        assert!(registry.untrack(TextureId(3)).is_none());
    }
}
