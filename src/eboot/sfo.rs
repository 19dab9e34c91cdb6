//! PARAM.SFO parameter blocks.
//!
//! The parameter block is a key/typed-value table: a 20-byte header (magic,
//! version, key table start, data table start, entry count) followed by
//! 16-byte index entries pointing into a key table of NUL-terminated names and
//! a data table of fixed-size value slots. Only a handful of keys are ever
//! consumed here (`TITLE`, `DISC_ID`, `CATEGORY`).

use indexmap::IndexMap;
use thiserror::Error;

/// Table magic, `"\0PSF"` read as a little-endian word.
pub const SFO_MAGIC: u32 = 0x4653_5000;

const HEADER_LEN: usize = 20;
const INDEX_ENTRY_LEN: usize = 16;

/// UTF-8 value, not NUL-terminated in the data table.
const FMT_UTF8_SPECIAL: u16 = 0x0004;
/// NUL-terminated UTF-8 value.
const FMT_UTF8: u16 = 0x0204;
/// 32-bit integer value.
const FMT_U32: u16 = 0x0404;

#[derive(Debug, Error)]
pub enum SfoError {
    #[error("parameter block truncated (need {need} bytes, have {have})")]
    Truncated { need: usize, have: usize },

    #[error("bad parameter block magic {0:#010x}")]
    BadMagic(u32),

    #[error("entry {0} points outside the parameter block")]
    EntryOutOfBounds(usize),

    #[error("entry {0} has a non-UTF-8 key")]
    BadKey(usize),
}

/// A decoded value slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SfoValue {
    Utf8(String),
    U32(u32),
    /// Unrecognized format, kept as raw bytes.
    Raw(Vec<u8>),
}

/// Decoded parameter table, preserving entry order.
#[derive(Debug, Clone, Default)]
pub struct SfoTable {
    entries: IndexMap<String, SfoValue>,
}

fn word(buf: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
}

fn half(buf: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([buf[at], buf[at + 1]])
}

impl SfoTable {
    /// Decode a parameter block. Every index entry is bounds-checked against
    /// the buffer before its key or data is touched.
    pub fn parse(buf: &[u8]) -> Result<Self, SfoError> {
        if buf.len() < HEADER_LEN {
            return Err(SfoError::Truncated {
                need: HEADER_LEN,
                have: buf.len(),
            });
        }
        let magic = word(buf, 0);
        if magic != SFO_MAGIC {
            return Err(SfoError::BadMagic(magic));
        }
        let key_table_start = word(buf, 8) as usize;
        let data_table_start = word(buf, 12) as usize;
        let count = word(buf, 16) as usize;

        let index_end = HEADER_LEN + count * INDEX_ENTRY_LEN;
        if index_end > buf.len() {
            return Err(SfoError::Truncated {
                need: index_end,
                have: buf.len(),
            });
        }

        let mut entries = IndexMap::with_capacity(count);
        for i in 0..count {
            let at = HEADER_LEN + i * INDEX_ENTRY_LEN;
            let key_offset = half(buf, at) as usize;
            let format = half(buf, at + 2);
            let data_len = word(buf, at + 4) as usize;
            let data_offset = word(buf, at + 12) as usize;

            let key_start = key_table_start
                .checked_add(key_offset)
                .ok_or(SfoError::EntryOutOfBounds(i))?;
            let key_bytes = buf
                .get(key_start..)
                .ok_or(SfoError::EntryOutOfBounds(i))?;
            let key_end = key_bytes
                .iter()
                .position(|&b| b == 0)
                .ok_or(SfoError::EntryOutOfBounds(i))?;
            let key = std::str::from_utf8(&key_bytes[..key_end])
                .map_err(|_| SfoError::BadKey(i))?
                .to_string();

            let data_start = data_table_start
                .checked_add(data_offset)
                .ok_or(SfoError::EntryOutOfBounds(i))?;
            let data_end = data_start
                .checked_add(data_len)
                .ok_or(SfoError::EntryOutOfBounds(i))?;
            let data = buf
                .get(data_start..data_end)
                .ok_or(SfoError::EntryOutOfBounds(i))?;

            let value = match format {
                FMT_UTF8 | FMT_UTF8_SPECIAL => {
                    let text = data.split(|&b| b == 0).next().unwrap_or(data);
                    SfoValue::Utf8(String::from_utf8_lossy(text).into_owned())
                }
                FMT_U32 if data.len() >= 4 => SfoValue::U32(word(data, 0)),
                _ => SfoValue::Raw(data.to_vec()),
            };
            entries.insert(key, value);
        }

        Ok(Self { entries })
    }

    pub fn get(&self, key: &str) -> Option<&SfoValue> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SfoValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Value as text, for keys like `TITLE` and `DISC_ID`.
    pub fn lookup_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            SfoValue::Utf8(text) => Some(text),
            _ => None,
        }
    }

    /// First two bytes of the value as a little-endian word.
    ///
    /// The category tag is consumed this way: the two-character category
    /// string (`"MG"`, `"EG"`, `"ME"`) is compared as a 16-bit value.
    pub fn lookup_u16(&self, key: &str) -> Option<u16> {
        match self.get(key)? {
            SfoValue::Utf8(text) => {
                let bytes = text.as_bytes();
                if bytes.len() < 2 {
                    return None;
                }
                Some(u16::from_le_bytes([bytes[0], bytes[1]]))
            }
            SfoValue::U32(value) => Some(*value as u16),
            SfoValue::Raw(bytes) => {
                if bytes.len() < 2 {
                    return None;
                }
                Some(u16::from_le_bytes([bytes[0], bytes[1]]))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a parameter block from (key, data, format) triples.
    fn build(entries: &[(&str, &[u8], u16)]) -> Vec<u8> {
        let count = entries.len();
        let key_table_start = HEADER_LEN + count * INDEX_ENTRY_LEN;

        let mut keys = Vec::new();
        let mut data = Vec::new();
        let mut index = Vec::new();
        for (key, value, format) in entries {
            let key_offset = keys.len() as u16;
            let data_offset = data.len() as u32;
            keys.extend_from_slice(key.as_bytes());
            keys.push(0);
            data.extend_from_slice(value);

            index.extend_from_slice(&key_offset.to_le_bytes());
            index.extend_from_slice(&format.to_le_bytes());
            index.extend_from_slice(&(value.len() as u32).to_le_bytes());
            index.extend_from_slice(&(value.len() as u32).to_le_bytes());
            index.extend_from_slice(&data_offset.to_le_bytes());
        }
        let data_table_start = key_table_start + keys.len();

        let mut buf = Vec::new();
        buf.extend_from_slice(&SFO_MAGIC.to_le_bytes());
        buf.extend_from_slice(&0x0101u32.to_le_bytes());
        buf.extend_from_slice(&(key_table_start as u32).to_le_bytes());
        buf.extend_from_slice(&(data_table_start as u32).to_le_bytes());
        buf.extend_from_slice(&(count as u32).to_le_bytes());
        buf.extend_from_slice(&index);
        buf.extend_from_slice(&keys);
        buf.extend_from_slice(&data);
        buf
    }

    #[test]
    fn test_parse_and_lookup() {
        let buf = build(&[
            ("CATEGORY", b"MG\0\0", FMT_UTF8),
            ("TITLE", b"Test App\0", FMT_UTF8),
            ("PARENTAL_LEVEL", &1u32.to_le_bytes(), FMT_U32),
        ]);
        let table = SfoTable::parse(&buf).unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.lookup_str("TITLE"), Some("Test App"));
        assert_eq!(table.lookup_u16("CATEGORY"), Some(u16::from_le_bytes(*b"MG")));
        assert_eq!(table.get("PARENTAL_LEVEL"), Some(&SfoValue::U32(1)));
        assert_eq!(table.lookup_str("DISC_ID"), None);
    }

    #[test]
    fn test_entry_order_is_preserved() {
        let buf = build(&[
            ("B_KEY", b"b\0", FMT_UTF8),
            ("A_KEY", b"a\0", FMT_UTF8),
        ]);
        let table = SfoTable::parse(&buf).unwrap();
        let keys: Vec<&str> = table.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["B_KEY", "A_KEY"]);
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut buf = build(&[("TITLE", b"x\0", FMT_UTF8)]);
        buf[1] = b'X';
        assert!(matches!(SfoTable::parse(&buf), Err(SfoError::BadMagic(_))));
    }

    #[test]
    fn test_rejects_truncated_index() {
        let buf = build(&[("TITLE", b"x\0", FMT_UTF8)]);
        assert!(matches!(
            SfoTable::parse(&buf[..HEADER_LEN + 4]),
            Err(SfoError::Truncated { .. })
        ));
    }

    #[test]
    fn test_rejects_out_of_bounds_data() {
        let mut buf = build(&[("TITLE", b"x\0", FMT_UTF8)]);
        // Point the data offset far past the end of the buffer.
        let at = HEADER_LEN + 12;
        buf[at..at + 4].copy_from_slice(&0xFFFF_0000u32.to_le_bytes());
        assert!(matches!(
            SfoTable::parse(&buf),
            Err(SfoError::EntryOutOfBounds(0))
        ));
    }
}
