use std::fmt;

/// Location of an asset inside the host's asset store, e.g. `textures/block/stone.png`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct AssetPath(String);

impl AssetPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Byte index of the extension dot, if the final path segment has one.
    fn extension_index(&self) -> Option<usize> {
        let dot = self.0.rfind('.')?;
        match self.0.rfind('/') {
            Some(separator) if separator > dot => None,
            _ => Some(dot),
        }
    }

    /// Inserts `suffix` in front of the file extension, or appends it when
    /// there is none: `block/stone.png` + `_n` gives `block/stone_n.png`.
    pub fn with_suffix(&self, suffix: &str) -> AssetPath {
        match self.extension_index() {
            Some(index) => {
                let (stem, extension) = self.0.split_at(index);
                AssetPath(format!("{stem}{suffix}{extension}"))
            }
            None => AssetPath(format!("{}{suffix}", self.0)),
        }
    }
}

impl fmt::Display for AssetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AssetPath {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AssetPath {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Name of a sprite inside an atlas, e.g. `blocks/stone`.
#[derive(Clone, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct SpriteName(String);

impl SpriteName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn with_suffix(&self, suffix: &str) -> SpriteName {
        SpriteName(format!("{}{suffix}", self.0))
    }
}

impl fmt::Display for SpriteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SpriteName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
