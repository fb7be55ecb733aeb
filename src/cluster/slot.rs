//! CRC16/XMODEM slot hashing, with the hash-tag rule that lets callers
//! colocate related keys on the same partition.

/// The standard CRC16/XMODEM table, reproduced inline rather than
/// pulling in a crate for a single fixed lookup table.
const CRC16_TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

fn crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        let index = (((crc >> 8) ^ byte as u16) & 0xFF) as usize;
        crc = (crc << 8) ^ CRC16_TABLE[index];
    }
    crc
}

/// Total number of hash slots in a Redis Cluster deployment.
pub const SLOT_COUNT: u16 = 16384;

/// Applies the `{tag}` rule: if `key` contains `{` followed somewhere
/// later by a non-empty `}`-delimited substring, only that substring is
/// hashed. Otherwise the whole key is hashed.
pub fn hash_tag(key: &[u8]) -> &[u8] {
    let Some(open) = key.iter().position(|&b| b == b'{') else {
        return key;
    };
    let after_open = &key[open + 1..];
    let Some(close) = after_open.iter().position(|&b| b == b'}') else {
        return key;
    };
    if close == 0 {
        return key;
    }
    &after_open[..close]
}

/// Computes the cluster slot `[0, 16384)` a key routes to.
pub fn slot_for_key(key: &[u8]) -> u16 {
    crc16(hash_tag(key)) % SLOT_COUNT
}
