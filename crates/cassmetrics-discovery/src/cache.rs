//! Discovery tree cache
//!
//! The tree is expensive to enumerate and rarely changes, so it is kept
//! between runs. [`FileTreeCache`] stores a snapshot file made of a fixed
//! header followed by the bincode-encoded tree:
//!
//! ```text
//! +-------+---------+----------+--------+----------------+
//! | magic | version | checksum | length | bincode(tree)  |
//! | u32   | u32     | u32      | u64    | length bytes   |
//! +-------+---------+----------+--------+----------------+
//! ```
//!
//! Writes go to a temporary file that is renamed over the snapshot, so a
//! reader never observes a half-written tree.

use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use cassmetrics_common::{Error, Result};
use parking_lot::RwLock;
use tracing::debug;

use crate::tree::DiscoveryTree;

/// Storage for a previously built tree
pub trait TreeCache: Send + Sync {
    /// Load the cached tree. `Ok(None)` means nothing is cached.
    fn load(&self) -> Result<Option<DiscoveryTree>>;

    /// Replace the cached tree
    fn save(&self, tree: &DiscoveryTree) -> Result<()>;

    /// Drop the cached tree
    fn clear(&self) -> Result<()>;
}

/// Cache that never holds anything
#[derive(Debug, Default)]
pub struct NoCache;

impl TreeCache for NoCache {
    fn load(&self) -> Result<Option<DiscoveryTree>> {
        Ok(None)
    }

    fn save(&self, _tree: &DiscoveryTree) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}

/// Process-local cache
#[derive(Debug, Default)]
pub struct MemoryTreeCache {
    tree: RwLock<Option<DiscoveryTree>>,
}

impl MemoryTreeCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TreeCache for MemoryTreeCache {
    fn load(&self) -> Result<Option<DiscoveryTree>> {
        Ok(self.tree.read().clone())
    }

    fn save(&self, tree: &DiscoveryTree) -> Result<()> {
        *self.tree.write() = Some(tree.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.tree.write() = None;
        Ok(())
    }
}

/// Snapshot file header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SnapshotHeader {
    magic: u32,
    version: u32,
    checksum: u32,
    length: u64,
}

impl SnapshotHeader {
    const SIZE: usize = 20;
    const MAGIC: u32 = 0x434D_5452; // "CMTR"
    const VERSION: u32 = 1;

    const fn new(checksum: u32, length: u64) -> Self {
        Self {
            magic: Self::MAGIC,
            version: Self::VERSION,
            checksum,
            length,
        }
    }

    fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[0..4].copy_from_slice(&self.magic.to_le_bytes());
        buf[4..8].copy_from_slice(&self.version.to_le_bytes());
        buf[8..12].copy_from_slice(&self.checksum.to_le_bytes());
        buf[12..20].copy_from_slice(&self.length.to_le_bytes());
        buf
    }

    fn from_bytes(buf: &[u8; Self::SIZE]) -> Result<Self> {
        let u32_at = |at: usize| u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]]);
        let mut length = [0u8; 8];
        length.copy_from_slice(&buf[12..20]);

        let header = Self {
            magic: u32_at(0),
            version: u32_at(4),
            checksum: u32_at(8),
            length: u64::from_le_bytes(length),
        };

        if header.magic != Self::MAGIC {
            return Err(Error::InvalidSnapshot("bad magic".into()));
        }
        if header.version != Self::VERSION {
            return Err(Error::InvalidSnapshot(format!(
                "unsupported version {}",
                header.version
            )));
        }
        Ok(header)
    }
}

/// Snapshot file on local disk
#[derive(Debug, Clone)]
pub struct FileTreeCache {
    path: PathBuf,
}

impl FileTreeCache {
    /// Cache stored at an explicit path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache for one managed server inside a cache directory
    pub fn for_server(dir: impl AsRef<Path>, key: &str) -> Self {
        Self::new(dir.as_ref().join(format!("{key}.tree")))
    }

    /// Snapshot path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl TreeCache for FileTreeCache {
    fn load(&self) -> Result<Option<DiscoveryTree>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut reader = BufReader::new(file);

        let mut header_buf = [0u8; SnapshotHeader::SIZE];
        reader.read_exact(&mut header_buf).map_err(|e| {
            if e.kind() == ErrorKind::UnexpectedEof {
                Error::InvalidSnapshot("truncated header".into())
            } else {
                e.into()
            }
        })?;
        let header = SnapshotHeader::from_bytes(&header_buf)?;

        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        if data.len() as u64 != header.length {
            return Err(Error::InvalidSnapshot(format!(
                "expected {} bytes, found {}",
                header.length,
                data.len()
            )));
        }
        if crc32c::crc32c(&data) != header.checksum {
            return Err(Error::InvalidSnapshot("checksum mismatch".into()));
        }

        let tree: DiscoveryTree = bincode::deserialize(&data)
            .map_err(|e| Error::Serialization(format!("failed to decode tree: {e}")))?;
        debug!(path = %self.path.display(), leaves = tree.len(), "Read tree snapshot");
        Ok(Some(tree))
    }

    fn save(&self, tree: &DiscoveryTree) -> Result<()> {
        let data = bincode::serialize(tree)
            .map_err(|e| Error::Serialization(format!("failed to encode tree: {e}")))?;
        let header = SnapshotHeader::new(crc32c::crc32c(&data), data.len() as u64);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let temp_path = self.temp_path();
        {
            let file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(&temp_path)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&header.to_bytes())?;
            writer.write_all(&data)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        std::fs::rename(&temp_path, &self.path)?;

        debug!(path = %self.path.display(), leaves = tree.len(), "Wrote tree snapshot");
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
