use crate::meta::{CompanionMapKind, KindMap, SpriteName};

/// Companion sprites attached to one base sprite, by name. The sprites
/// themselves live in the atlas's [`AtlasCompanionHolder`](crate::pbr::AtlasCompanionHolder).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpriteCompanionHolder {
    sprites: KindMap<Option<SpriteName>>,
}

impl SpriteCompanionHolder {
    pub fn get(&self, kind: CompanionMapKind) -> Option<&SpriteName> {
        self.sprites.get(kind).as_ref()
    }

    pub fn set(&mut self, kind: CompanionMapKind, name: SpriteName) {
        *self.sprites.get_mut(kind) = Some(name);
    }

    pub fn normal_sprite(&self) -> Option<&SpriteName> {
        self.get(CompanionMapKind::Normal)
    }

    pub fn specular_sprite(&self) -> Option<&SpriteName> {
        self.get(CompanionMapKind::Specular)
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }
}
