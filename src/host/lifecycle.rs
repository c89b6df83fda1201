use crate::{
    host::AssetStore,
    meta::{AssetPath, Preparations, SpriteInfo, SpritePlacement},
    pbr::SpriteCompanionHolder,
};

/// Extension point host sprites expose so companion sprites can be attached.
pub trait CompanionSpriteExtension {
    fn companion_holder(&self) -> Option<&SpriteCompanionHolder>;

    fn companion_holder_slot(&mut self) -> &mut Option<SpriteCompanionHolder>;

    fn companion_holder_or_create(&mut self) -> &mut SpriteCompanionHolder {
        self.companion_holder_slot().get_or_insert_with(SpriteCompanionHolder::default)
    }
}

/// Raised by the host atlas after it tried to load one sprite during a stitch.
pub struct SpriteLoadedEvent<'a> {
    pub assets: &'a dyn AssetStore,
    pub info: &'a SpriteInfo,
    /// Asset the base sprite's pixels came from.
    pub image_location: &'a AssetPath,
    pub placement: SpritePlacement,
    /// `None` when the base sprite failed to load.
    pub sprite: Option<&'a mut dyn CompanionSpriteExtension>,
}

/// Lifecycle events a host atlas raises to its subscribers, in order:
/// `before_sprite_loading`, one `on_sprite_loaded` per sprite, `on_reload`,
/// then any number of `on_cycle_animation_frames`, and finally
/// `on_release_id` and/or `on_close`.
pub trait AtlasLifecycleListener {
    fn before_sprite_loading(&mut self);

    fn on_sprite_loaded(&mut self, event: SpriteLoadedEvent<'_>);

    fn on_reload(&mut self, preparations: &Preparations);

    fn on_cycle_animation_frames(&mut self);

    fn on_release_id(&mut self);

    fn on_close(&mut self);
}
