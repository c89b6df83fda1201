use std::fmt;

use image::Rgba;

/// The two companion maps a sprite or texture can carry.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CompanionMapKind {
    Normal,
    Specular,
}

impl CompanionMapKind {
    pub const ALL: [CompanionMapKind; 2] = [CompanionMapKind::Normal, CompanionMapKind::Specular];

    /// Suffix inserted into asset paths and sprite names.
    pub const fn suffix(self) -> &'static str {
        match self {
            CompanionMapKind::Normal => "_n",
            CompanionMapKind::Specular => "_s",
        }
    }

    /// Packed RGBA fallback color.
    pub const fn default_color(self) -> u32 {
        match self {
            // Flat tangent-space normal, full alpha.
            CompanionMapKind::Normal => 0x7F7F_FFFF,
            CompanionMapKind::Specular => 0x0000_0000,
        }
    }

    pub fn default_pixel(self) -> Rgba<u8> {
        Rgba(self.default_color().to_be_bytes())
    }
}

impl fmt::Display for CompanionMapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompanionMapKind::Normal => f.write_str("normal"),
            CompanionMapKind::Specular => f.write_str("specular"),
        }
    }
}

/// One value per [`CompanionMapKind`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct KindMap<T> {
    pub normal: T,
    pub specular: T,
}

impl<T> KindMap<T> {
    pub fn new(normal: T, specular: T) -> Self {
        Self { normal, specular }
    }

    pub fn from_fn<F>(mut f: F) -> Self
    where
        F: FnMut(CompanionMapKind) -> T,
    {
        Self {
            normal: f(CompanionMapKind::Normal),
            specular: f(CompanionMapKind::Specular),
        }
    }

    pub fn get(&self, kind: CompanionMapKind) -> &T {
        match kind {
            CompanionMapKind::Normal => &self.normal,
            CompanionMapKind::Specular => &self.specular,
        }
    }

    pub fn get_mut(&mut self, kind: CompanionMapKind) -> &mut T {
        match kind {
            CompanionMapKind::Normal => &mut self.normal,
            CompanionMapKind::Specular => &mut self.specular,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (CompanionMapKind, &T)> {
        CompanionMapKind::ALL
            .into_iter()
            .map(move |kind| (kind, self.get(kind)))
    }

    pub fn into_entries(self) -> impl Iterator<Item = (CompanionMapKind, T)> {
        [
            (CompanionMapKind::Normal, self.normal),
            (CompanionMapKind::Specular, self.specular),
        ]
        .into_iter()
    }
}

impl<T> KindMap<Option<T>> {
    pub fn is_empty(&self) -> bool {
        self.normal.is_none() && self.specular.is_none()
    }
}
