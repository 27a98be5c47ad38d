use std::{fs::File, path::Path};

use anyhow::Context;
use memmap2::Mmap;

/// A read-only memory mapping of the input file. The mapping is released
/// when the value is dropped, on success and failure paths alike.
pub struct Source {
    mmap: Mmap,
}

impl Source {
    pub fn map(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        // SAFETY: the mapping is read-only and we never modify the file
        // ourselves; concurrent modification by another process is outside
        // our control, as with any mapped input.
        let mmap = unsafe {
            Mmap::map(&file).with_context(|| format!("failed to map {}", path.display()))?
        };
        Ok(Self { mmap })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}
