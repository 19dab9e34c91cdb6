//! Volume-prefixed console paths and the storage contract consumed by the
//! classifier and the plugin list store.
//!
//! On the console every path carries a volume prefix (`ms0:/...` for the
//! memory stick, `ef0:/...` for the internal flash of the Go). The launcher
//! only ever inspects that prefix tag; everything after it is opaque. The
//! [`Storage`] trait abstracts the firmware I/O primitives so the same logic
//! runs against a host directory tree ([`DirStorage`]) in tools and tests.

use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};

/// Memory stick volume prefix tag.
pub const MS0_PREFIX: &str = "ms0:";

/// Internal flash (PSP Go) volume prefix tag.
pub const EF0_PREFIX: &str = "ef0:";

/// Physical volume a console path lives on, derived from its 4-byte prefix tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Volume {
    Ms0,
    Ef0,
    /// Any other prefix (`flash0:`, `disc0:`, ...). The launcher treats these
    /// like the memory stick for run-level selection.
    Other,
}

/// Determine the volume of a console path from its prefix tag.
///
/// Only the first four bytes are compared, matching the firmware convention
/// of tagging volumes with fixed 4-byte prefixes.
pub fn volume_of(path: &str) -> Volume {
    let tag = path.get(..4).unwrap_or("");
    if tag.eq_ignore_ascii_case(MS0_PREFIX) {
        Volume::Ms0
    } else if tag.eq_ignore_ascii_case(EF0_PREFIX) {
        Volume::Ef0
    } else {
        Volume::Other
    }
}

/// Storage primitives consumed by the launcher core.
///
/// Paths are volume-prefixed strings (`"<volume>:/..."`). Implementations are
/// synchronous; all I/O is treated as bounded and local.
pub trait Storage {
    /// Whether a file exists at `path`.
    fn exists(&self, path: &str) -> bool;

    /// Read the whole file at `path`.
    fn read(&self, path: &str) -> io::Result<Vec<u8>>;

    /// Read up to `len` bytes starting at `offset`. Short files return
    /// whatever is there past the offset, possibly nothing.
    fn read_at(&self, path: &str, offset: u64, len: usize) -> io::Result<Vec<u8>>;

    /// Create or truncate the file at `path` and write `contents` to it.
    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()>;

    /// First four bytes of the file as a little-endian word, if readable.
    fn magic_u32(&self, path: &str) -> Option<u32> {
        let bytes = self.read_at(path, 0, 4).ok()?;
        if bytes.len() < 4 {
            return None;
        }
        Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Host-directory backed storage.
///
/// Each volume prefix maps to a directory under the mount root, so
/// `ms0:/SEPLUGINS/PLUGINS.TXT` resolves to `<root>/ms0/SEPLUGINS/PLUGINS.TXT`.
/// A missing volume directory behaves like a missing memory stick: reads fail,
/// `exists` reports false.
#[derive(Debug, Clone)]
pub struct DirStorage {
    root: Utf8PathBuf,
}

impl DirStorage {
    pub fn new<P: AsRef<Utf8Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Map a volume-prefixed console path onto the host tree.
    ///
    /// Returns `None` for strings without a `<volume>:/` prefix.
    fn host_path(&self, path: &str) -> Option<Utf8PathBuf> {
        let (volume, rest) = path.split_once(":/")?;
        if volume.is_empty() || volume.contains('/') {
            return None;
        }
        Some(self.root.join(volume.to_ascii_lowercase()).join(rest))
    }
}

impl Storage for DirStorage {
    fn exists(&self, path: &str) -> bool {
        self.host_path(path).is_some_and(|p| p.is_file())
    }

    fn read(&self, path: &str) -> io::Result<Vec<u8>> {
        let host = self
            .host_path(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("not a volume path: {path}")))?;
        fs::read(host)
    }

    fn read_at(&self, path: &str, offset: u64, len: usize) -> io::Result<Vec<u8>> {
        let host = self
            .host_path(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("not a volume path: {path}")))?;
        let mut file = File::open(host)?;
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = Vec::with_capacity(len.min(64 * 1024));
        file.take(len as u64).read_to_end(&mut buf)?;
        Ok(buf)
    }

    fn write(&self, path: &str, contents: &[u8]) -> io::Result<()> {
        let host = self
            .host_path(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, format!("not a volume path: {path}")))?;
        if let Some(parent) = host.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(host, contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn storage() -> (DirStorage, TempDir) {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
        (DirStorage::new(&root), temp)
    }

    #[test]
    fn test_volume_of_prefix_tags() {
        assert_eq!(volume_of("ms0:/PSP/GAME/APP/EBOOT.PBP"), Volume::Ms0);
        assert_eq!(volume_of("MS0:/PSP/GAME/APP/EBOOT.PBP"), Volume::Ms0);
        assert_eq!(volume_of("ef0:/PSP/GAME/APP/EBOOT.PBP"), Volume::Ef0);
        assert_eq!(volume_of("flash0:/kd/x.prx"), Volume::Other);
        assert_eq!(volume_of("ms"), Volume::Other);
    }

    #[test]
    fn test_write_then_read() {
        let (storage, _temp) = storage();
        storage
            .write("ms0:/SEPLUGINS/PLUGINS.TXT", b"hello\n")
            .unwrap();
        assert!(storage.exists("ms0:/SEPLUGINS/PLUGINS.TXT"));
        assert_eq!(storage.read("ms0:/SEPLUGINS/PLUGINS.TXT").unwrap(), b"hello\n");
    }

    #[test]
    fn test_read_at_clamps_to_file_end() {
        let (storage, _temp) = storage();
        storage.write("ms0:/a.bin", b"0123456789").unwrap();
        assert_eq!(storage.read_at("ms0:/a.bin", 4, 3).unwrap(), b"456");
        assert_eq!(storage.read_at("ms0:/a.bin", 8, 100).unwrap(), b"89");
        assert!(storage.read_at("ms0:/a.bin", 50, 4).unwrap().is_empty());
    }

    #[test]
    fn test_missing_volume_behaves_like_missing_media() {
        let (storage, _temp) = storage();
        assert!(!storage.exists("ef0:/SEPLUGINS/PLUGINS.TXT"));
        assert!(storage.read("ef0:/SEPLUGINS/PLUGINS.TXT").is_err());
    }

    #[test]
    fn test_magic_u32() {
        let (storage, _temp) = storage();
        storage.write("ms0:/e.bin", &[0x7F, b'E', b'L', b'F', 0x01]).unwrap();
        assert_eq!(storage.magic_u32("ms0:/e.bin"), Some(0x464C_457F));
        storage.write("ms0:/short.bin", &[0x7F, b'E']).unwrap();
        assert_eq!(storage.magic_u32("ms0:/short.bin"), None);
        assert_eq!(storage.magic_u32("ms0:/absent.bin"), None);
    }

    #[test]
    fn test_bare_path_is_rejected() {
        let (storage, _temp) = storage();
        assert!(!storage.exists("no-volume-prefix.txt"));
        assert!(storage.read("no-volume-prefix.txt").is_err());
    }
}
