//! Commit log record framing.

use crate::error::{CoreError, CoreResult};
use crate::store::WriteBatch;
use crate::types::SequenceNumber;
use crate::value::{Key, Value};
use serde::{Deserialize, Serialize};

/// Magic bytes opening every commit log record.
pub(crate) const LOG_MAGIC: [u8; 4] = *b"SKVL";

/// Current record format version.
pub(crate) const LOG_VERSION: u16 = 1;

/// magic (4) + version (2) + length (4)
const HEADER_SIZE: usize = 10;

const CRC_SIZE: usize = 4;

/// One durable apply, as persisted in the commit log.
///
/// Values are kept in their encoded JSON form so the record stays
/// independent of how callers represent them in memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FlushRecord {
    pub sequence: u64,
    pub puts: Vec<(Key, String)>,
    pub deletes: Vec<Key>,
}

impl FlushRecord {
    /// Captures `batch` under `sequence`.
    pub fn from_batch(sequence: SequenceNumber, batch: &WriteBatch<'_>) -> CoreResult<Self> {
        let puts = batch
            .puts()
            .map(|(key, value)| {
                let text = String::from_utf8(value.encode()?)
                    .map_err(|e| CoreError::codec(e.to_string()))?;
                Ok((key.clone(), text))
            })
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(Self {
            sequence: sequence.as_u64(),
            puts,
            deletes: batch.deletes().cloned().collect(),
        })
    }

    /// Decodes the staged puts back into values.
    pub fn decoded_puts(&self) -> CoreResult<Vec<(Key, Value)>> {
        self.puts
            .iter()
            .map(|(key, text)| Ok((key.clone(), Value::decode(text.as_bytes())?)))
            .collect()
    }

    /// Serialises the record with its envelope.
    pub fn encode(&self) -> CoreResult<Vec<u8>> {
        let mut payload = Vec::new();
        ciborium::into_writer(self, &mut payload).map_err(|e| CoreError::codec(e.to_string()))?;

        let len = u32::try_from(payload.len())
            .map_err(|_| CoreError::invalid_argument("commit record exceeds 4 GiB"))?;

        let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
        data.extend_from_slice(&LOG_MAGIC);
        data.extend_from_slice(&LOG_VERSION.to_le_bytes());
        data.extend_from_slice(&len.to_le_bytes());
        data.extend_from_slice(&payload);

        let crc = compute_crc32(&data);
        data.extend_from_slice(&crc.to_le_bytes());
        Ok(data)
    }

    /// Decodes the record at the start of `buf`.
    ///
    /// Returns `Ok(None)` when `buf` ends before the record does (a torn
    /// final append) and the number of bytes consumed otherwise. `offset`
    /// is only used to locate errors.
    pub fn decode(buf: &[u8], offset: u64) -> CoreResult<Option<(Self, usize)>> {
        if buf.len() < HEADER_SIZE {
            return Ok(None);
        }
        if buf[0..4] != LOG_MAGIC {
            return Err(CoreError::log_corruption(offset, "bad record magic"));
        }
        let version = u16::from_le_bytes([buf[4], buf[5]]);
        if version != LOG_VERSION {
            return Err(CoreError::log_corruption(
                offset,
                format!("unsupported record version {version}"),
            ));
        }
        let len = u32::from_le_bytes([buf[6], buf[7], buf[8], buf[9]]) as usize;
        let total = HEADER_SIZE + len + CRC_SIZE;
        if buf.len() < total {
            return Ok(None);
        }

        let body_end = HEADER_SIZE + len;
        let expected = u32::from_le_bytes([
            buf[body_end],
            buf[body_end + 1],
            buf[body_end + 2],
            buf[body_end + 3],
        ]);
        let actual = compute_crc32(&buf[..body_end]);
        if expected != actual {
            return Err(CoreError::ChecksumMismatch {
                offset,
                expected,
                actual,
            });
        }

        let record: FlushRecord = ciborium::from_reader(&buf[HEADER_SIZE..body_end])
            .map_err(|e| CoreError::log_corruption(offset, e.to_string()))?;
        Ok(Some((record, total)))
    }
}

/// CRC-32 (IEEE polynomial) over `data`.
#[must_use]
pub(crate) fn compute_crc32(data: &[u8]) -> u32 {
    const TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut bit = 0;
            while bit < 8 {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ 0xEDB8_8320
                } else {
                    crc >> 1
                };
                bit += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        crc = (crc >> 8) ^ TABLE[((crc ^ u32::from(byte)) & 0xFF) as usize];
    }
    !crc
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn sample() -> FlushRecord {
        let mut puts = BTreeMap::new();
        puts.insert("user:1".to_string(), Value::from("Ava"));
        let mut deletes = BTreeSet::new();
        deletes.insert("user:2".to_string());
        FlushRecord::from_batch(SequenceNumber::new(3), &WriteBatch::new(&puts, &deletes)).unwrap()
    }

    #[test]
    fn crc32_known_vector() {
        assert_eq!(compute_crc32(b"123456789"), 0xCBF4_3926);
        assert_eq!(compute_crc32(b""), 0);
    }

    #[test]
    fn record_keeps_values_encoded() {
        let record = sample();
        assert_eq!(record.puts, vec![("user:1".to_string(), "\"Ava\"".to_string())]);
        assert_eq!(record.deletes, vec!["user:2".to_string()]);
        assert_eq!(
            record.decoded_puts().unwrap(),
            vec![("user:1".to_string(), Value::from("Ava"))]
        );
    }

    #[test]
    fn decode_reads_back_an_encoded_record() {
        let record = sample();
        let bytes = record.encode().unwrap();

        let (decoded, consumed) = FlushRecord::decode(&bytes, 0).unwrap().unwrap();
        assert_eq!(decoded, record);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn torn_record_is_reported_as_incomplete() {
        let bytes = sample().encode().unwrap();
        for cut in [0, 5, HEADER_SIZE, bytes.len() - 1] {
            assert!(FlushRecord::decode(&bytes[..cut], 0).unwrap().is_none());
        }
    }

    #[test]
    fn flipped_payload_bit_fails_the_checksum() {
        let mut bytes = sample().encode().unwrap();
        bytes[HEADER_SIZE + 2] ^= 0x40;

        assert!(matches!(
            FlushRecord::decode(&bytes, 128),
            Err(CoreError::ChecksumMismatch { offset: 128, .. })
        ));
    }

    #[test]
    fn bad_magic_is_corruption() {
        let mut bytes = sample().encode().unwrap();
        bytes[0] = b'X';
        assert!(matches!(
            FlushRecord::decode(&bytes, 0),
            Err(CoreError::LogCorruption { .. })
        ));
    }
}
