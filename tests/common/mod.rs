// Shared fixtures for the integration tests: a host-directory mount and
// builders for small but well-formed PBP/SFO blobs.
#![allow(dead_code)]

use arkbooter::DirStorage;
use arkbooter::eboot::{PBP_HEADER_LEN, PBP_MAGIC, sfo::SFO_MAGIC};
use camino::Utf8PathBuf;
use tempfile::TempDir;

/// NUL-terminated UTF-8 SFO value format.
pub const FMT_UTF8: u16 = 0x0204;

pub fn mount() -> (DirStorage, TempDir) {
    let temp = TempDir::new().unwrap();
    let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).unwrap();
    (DirStorage::new(&root), temp)
}

/// Assemble a parameter block from (key, data, format) triples.
pub fn build_sfo(entries: &[(&str, &[u8], u16)]) -> Vec<u8> {
    let count = entries.len();
    let key_table_start = 20 + count * 16;

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

/// A container whose only section is the given parameter block. An empty
/// block produces a container with no parameter section at all.
pub fn build_pbp(sfo: &[u8]) -> Vec<u8> {
    let param_offset = PBP_HEADER_LEN as u32;
    let end = param_offset + sfo.len() as u32;

    let mut buf = Vec::new();
    buf.extend_from_slice(&PBP_MAGIC.to_le_bytes());
    buf.extend_from_slice(&0x0001_0000u32.to_le_bytes());
    buf.extend_from_slice(&param_offset.to_le_bytes());
    for _ in 0..7 {
        buf.extend_from_slice(&end.to_le_bytes());
    }
    buf.extend_from_slice(sfo);
    buf
}

/// A container carrying only a CATEGORY tag.
pub fn category_pbp(category: &str) -> Vec<u8> {
    let mut value = category.as_bytes().to_vec();
    value.push(0);
    build_pbp(&build_sfo(&[("CATEGORY", &value, FMT_UTF8)]))
}

/// A container whose section offsets run backwards.
pub fn corrupt_pbp() -> Vec<u8> {
    let mut buf = build_pbp(&build_sfo(&[("CATEGORY", b"MG\0", FMT_UTF8)]));
    // swap param and icon0 offsets
    let icon0 = buf[12..16].to_vec();
    let param = buf[8..12].to_vec();
    buf[8..12].copy_from_slice(&icon0);
    buf[12..16].copy_from_slice(&param);
    buf
}
