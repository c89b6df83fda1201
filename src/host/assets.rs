use std::{
    cell::Cell,
    collections::{HashMap, HashSet},
    io,
    rc::Rc,
};

use crate::{meta::AssetPath, utils::TsuyaError};

/// An opened asset. Must be closed explicitly once the caller is done with it.
pub trait AssetResource {
    fn read_to_end(&mut self) -> io::Result<Vec<u8>>;

    /// Raw sidecar metadata (JSON), if the asset has any.
    fn metadata(&self) -> Option<&[u8]>;

    fn close(&mut self) -> io::Result<()>;
}

/// Read access to named assets.
///
/// `open` reports a missing asset as [`TsuyaError::NotFound`], distinct from
/// every other failure.
pub trait AssetStore {
    fn open(&self, path: &AssetPath) -> Result<Box<dyn AssetResource>, TsuyaError>;
}

#[derive(Clone, Debug)]
struct MemoryAsset {
    bytes: Vec<u8>,
    metadata: Option<Vec<u8>>,
}

////////////////////////////////////////////////
/// MemoryAssetStore
/// * Serves assets from memory.
/// * Counts resources that were opened and not yet closed.
/// * Individual assets can be flagged to fail on read or on close.
////////////////////////////////////////////////
#[derive(Debug, Default)]
pub struct MemoryAssetStore {
    assets: HashMap<AssetPath, MemoryAsset>,
    failing_reads: HashSet<AssetPath>,
    failing_closes: HashSet<AssetPath>,
    open: Rc<Cell<usize>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<AssetPath>, bytes: Vec<u8>) {
        self.assets.insert(
            path.into(),
            MemoryAsset {
                bytes,
                metadata: None,
            },
        );
    }

    pub fn insert_with_metadata(
        &mut self,
        path: impl Into<AssetPath>,
        bytes: Vec<u8>,
        metadata: impl Into<Vec<u8>>,
    ) {
        self.assets.insert(
            path.into(),
            MemoryAsset {
                bytes,
                metadata: Some(metadata.into()),
            },
        );
    }

    pub fn fail_reads(&mut self, path: impl Into<AssetPath>) {
        self.failing_reads.insert(path.into());
    }

    pub fn fail_closes(&mut self, path: impl Into<AssetPath>) {
        self.failing_closes.insert(path.into());
    }

    /// Resources handed out and not closed yet.
    pub fn open_resources(&self) -> usize {
        self.open.get()
    }
}

impl AssetStore for MemoryAssetStore {
    fn open(&self, path: &AssetPath) -> Result<Box<dyn AssetResource>, TsuyaError> {
        let asset = self
            .assets
            .get(path)
            .ok_or_else(|| TsuyaError::NotFound(path.clone()))?;

        self.open.set(self.open.get() + 1);
        Ok(Box::new(MemoryResource {
            asset: asset.clone(),
            fail_read: self.failing_reads.contains(path),
            fail_close: self.failing_closes.contains(path),
            open: Rc::clone(&self.open),
            closed: false,
        }))
    }
}

struct MemoryResource {
    asset: MemoryAsset,
    fail_read: bool,
    fail_close: bool,
    open: Rc<Cell<usize>>,
    closed: bool,
}

impl AssetResource for MemoryResource {
    fn read_to_end(&mut self) -> io::Result<Vec<u8>> {
        if self.fail_read {
            return Err(io::Error::other("read failed"));
        }
        Ok(self.asset.bytes.clone())
    }

    fn metadata(&self) -> Option<&[u8]> {
        self.asset.metadata.as_deref()
    }

    fn close(&mut self) -> io::Result<()> {
        if !self.closed {
            self.closed = true;
            self.open.set(self.open.get().saturating_sub(1));
        }
        if self.fail_close {
            return Err(io::Error::other("close failed"));
        }
        Ok(())
    }
}
