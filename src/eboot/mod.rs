//! Packaged-executable (PBP) containers.
//!
//! An EBOOT.PBP file is a fixed-layout container: a 40-byte header holding a
//! magic tag and eight section offsets, followed by the sections themselves
//! (parameter block, icons, preview images, audio preview, executable payload,
//! PSAR archive). Sections are contiguous and ordered, so each section's size
//! is the gap to the next offset; the trailing PSAR section runs to end of
//! file.

pub mod classify;
pub mod launch;
pub mod sfo;

use crate::storage::Storage;
use self::sfo::SfoTable;
use std::io;
use thiserror::Error;

/// Container magic, `"\0PBP"` read as a little-endian word.
pub const PBP_MAGIC: u32 = 0x5042_5000;

/// Raw executable magic, `"\x7fELF"` read as a little-endian word.
pub const ELF_MAGIC: u32 = 0x464C_457F;

/// Size of the fixed container header.
pub const PBP_HEADER_LEN: usize = 40;

/// Errors produced while decoding a PBP container.
#[derive(Debug, Error)]
pub enum PbpError {
    #[error("container header truncated ({have} of {PBP_HEADER_LEN} bytes)")]
    Truncated { have: usize },

    #[error("bad container magic {0:#010x}")]
    BadMagic(u32),

    /// Section offsets must never decrease; a corrupt or hostile file could
    /// otherwise yield absurd derived section sizes.
    #[error("section offsets are not monotonically non-decreasing")]
    NonMonotonicOffsets,

    #[error("container I/O failed: {0}")]
    Io(#[from] io::Error),
}

/// The sections of a PBP container, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// PARAM.SFO parameter block.
    Param,
    /// ICON0.PNG.
    Icon0,
    /// ICON1.PMF animated icon.
    Icon1,
    /// PIC0.PNG.
    Pic0,
    /// PIC1.PNG background.
    Pic1,
    /// SND0.AT3 audio preview.
    Snd0,
    /// DATA.PSP executable payload.
    PspData,
    /// DATA.PSAR archive.
    PsarData,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::Param,
        Section::Icon0,
        Section::Icon1,
        Section::Pic0,
        Section::Pic1,
        Section::Snd0,
        Section::PspData,
        Section::PsarData,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Section::Param => "PARAM.SFO",
            Section::Icon0 => "ICON0.PNG",
            Section::Icon1 => "ICON1.PMF",
            Section::Pic0 => "PIC0.PNG",
            Section::Pic1 => "PIC1.PNG",
            Section::Snd0 => "SND0.AT3",
            Section::PspData => "DATA.PSP",
            Section::PsarData => "DATA.PSAR",
        }
    }
}

/// Decoded PBP container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PbpHeader {
    pub magic: u32,
    pub version: u32,
    pub param_offset: u32,
    pub icon0_offset: u32,
    pub icon1_offset: u32,
    pub pic0_offset: u32,
    pub pic1_offset: u32,
    pub snd0_offset: u32,
    pub psp_offset: u32,
    pub psar_offset: u32,
}

fn word(buf: &[u8], index: usize) -> u32 {
    let at = index * 4;
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

impl PbpHeader {
    /// Decode the header from the first bytes of a container file.
    ///
    /// Validates the magic and that the section offsets are monotonically
    /// non-decreasing, so derived section sizes can never go negative.
    pub fn parse(buf: &[u8]) -> Result<Self, PbpError> {
        if buf.len() < PBP_HEADER_LEN {
            return Err(PbpError::Truncated { have: buf.len() });
        }
        let header = Self {
            magic: word(buf, 0),
            version: word(buf, 1),
            param_offset: word(buf, 2),
            icon0_offset: word(buf, 3),
            icon1_offset: word(buf, 4),
            pic0_offset: word(buf, 5),
            pic1_offset: word(buf, 6),
            snd0_offset: word(buf, 7),
            psp_offset: word(buf, 8),
            psar_offset: word(buf, 9),
        };
        if header.magic != PBP_MAGIC {
            return Err(PbpError::BadMagic(header.magic));
        }
        let offsets = header.offsets();
        if offsets.windows(2).any(|pair| pair[0] > pair[1]) {
            return Err(PbpError::NonMonotonicOffsets);
        }
        Ok(header)
    }

    /// Section offsets in file order.
    pub fn offsets(&self) -> [u32; 8] {
        [
            self.param_offset,
            self.icon0_offset,
            self.icon1_offset,
            self.pic0_offset,
            self.pic1_offset,
            self.snd0_offset,
            self.psp_offset,
            self.psar_offset,
        ]
    }

    pub fn offset_of(&self, section: Section) -> u32 {
        self.offsets()[section as usize]
    }

    /// Byte length of a section, derived from the gap to the next offset.
    ///
    /// The trailing PSAR section has no derived length and reads to end of
    /// file. A zero length means the section is absent.
    pub fn section_len(&self, section: Section) -> Option<u32> {
        let offsets = self.offsets();
        let index = section as usize;
        if index + 1 < offsets.len() {
            Some(offsets[index + 1] - offsets[index])
        } else {
            None
        }
    }
}

/// Title and identifier extracted from a container's parameter block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SfoInfo {
    pub title: String,
    pub disc_id: String,
}

/// One packaged-executable file on storage.
///
/// The header is read once when the container is opened; section payloads are
/// read on demand and not cached.
#[derive(Debug, Clone)]
pub struct Eboot {
    path: String,
    name: String,
    file_name: String,
    header: PbpHeader,
}

impl Eboot {
    /// Open a container and decode its header.
    pub fn open<S: Storage>(storage: &S, path: &str) -> Result<Self, PbpError> {
        let raw = storage.read_at(path, 0, PBP_HEADER_LEN)?;
        let header = PbpHeader::parse(&raw)?;

        // The display name falls back to the holding directory's name,
        // matching how game folders are laid out under PSP/GAME.
        let (dir, file_name) = match path.rsplit_once('/') {
            Some((dir, file)) => (dir, file),
            None => ("", path),
        };
        let name = dir.rsplit('/').next().unwrap_or(dir);

        Ok(Self {
            path: path.to_string(),
            name: name.to_string(),
            file_name: file_name.to_string(),
            header,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Name of the directory holding the container.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn header(&self) -> &PbpHeader {
        &self.header
    }

    /// Read a section's payload. Absent sections yield an empty buffer.
    pub fn read_section<S: Storage>(&self, storage: &S, section: Section) -> Result<Vec<u8>, PbpError> {
        let offset = self.header.offset_of(section) as u64;
        match self.header.section_len(section) {
            Some(0) => Ok(Vec::new()),
            Some(len) => Ok(storage.read_at(&self.path, offset, len as usize)?),
            None => {
                // PSAR: everything from its offset to end of file.
                let whole = storage.read(&self.path)?;
                Ok(whole.get(offset as usize..).unwrap_or_default().to_vec())
            }
        }
    }

    /// Extract `TITLE` and `DISC_ID` from the parameter block.
    ///
    /// Missing or malformed metadata degrades to the directory-name title and
    /// an empty identifier rather than failing.
    pub fn sfo_info<S: Storage>(&self, storage: &S) -> SfoInfo {
        let mut info = SfoInfo {
            title: self.name.clone(),
            disc_id: String::new(),
        };
        let block = match self.read_section(storage, Section::Param) {
            Ok(block) if !block.is_empty() => block,
            Ok(_) => return info,
            Err(err) => {
                tracing::debug!("{}: parameter block unreadable: {err}", self.path);
                return info;
            }
        };
        match SfoTable::parse(&block) {
            Ok(table) => {
                if let Some(title) = table.lookup_str("TITLE") {
                    info.title = title.to_string();
                }
                if let Some(disc_id) = table.lookup_str("DISC_ID") {
                    info.disc_id = disc_id.to_string();
                }
            }
            Err(err) => {
                tracing::debug!("{}: parameter block undecodable: {err}", self.path);
            }
        }
        info
    }
}

/// Filename check for packaged executables (`*.pbp` or the VHBL loader).
pub fn is_eboot(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.ends_with(".pbp") || lower.contains("wmenu.bin")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(offsets: [u32; 8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(PBP_HEADER_LEN);
        buf.extend_from_slice(&PBP_MAGIC.to_le_bytes());
        buf.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        for offset in offsets {
            buf.extend_from_slice(&offset.to_le_bytes());
        }
        buf
    }

    #[test]
    fn test_parse_valid_header() {
        let header = PbpHeader::parse(&header_bytes([40, 140, 140, 140, 140, 140, 200, 300])).unwrap();
        assert_eq!(header.param_offset, 40);
        assert_eq!(header.section_len(Section::Param), Some(100));
        assert_eq!(header.section_len(Section::Icon0), Some(0));
        assert_eq!(header.section_len(Section::PspData), Some(100));
        assert_eq!(header.section_len(Section::PsarData), None);
    }

    #[test]
    fn test_parse_rejects_truncated() {
        let err = PbpHeader::parse(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, PbpError::Truncated { have: 10 }));
    }

    #[test]
    fn test_parse_rejects_bad_magic() {
        let mut buf = header_bytes([40, 40, 40, 40, 40, 40, 40, 40]);
        buf[0] = b'X';
        assert!(matches!(PbpHeader::parse(&buf), Err(PbpError::BadMagic(_))));
    }

    #[test]
    fn test_parse_rejects_decreasing_offsets() {
        let buf = header_bytes([140, 40, 140, 140, 140, 140, 200, 300]);
        assert!(matches!(
            PbpHeader::parse(&buf),
            Err(PbpError::NonMonotonicOffsets)
        ));
    }

    #[test]
    fn test_is_eboot() {
        assert!(is_eboot("ms0:/PSP/GAME/APP/EBOOT.PBP"));
        assert!(is_eboot("ms0:/PSP/GAME/APP/eboot.pbp"));
        assert!(is_eboot("ms0:/PSP/GAME/VHBL/wmenu.bin"));
        assert!(!is_eboot("ms0:/ISO/game.iso"));
    }
}
