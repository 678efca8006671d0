//! Record types shared by every store provider.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::codec::TileBlob;

/// Number of hex characters kept from the content digest.
const DIGEST_LEN: usize = 16;

/// Error parsing a revision string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid revision '{0}': expected '<seq>-<digest>'")]
pub struct ParseRevisionError(pub String);

/// Identifier of one stored version of a key, formatted `"{seq}-{digest}"`.
///
/// Revisions of the same key order by `seq`; the digest only disambiguates.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision {
    pub seq: u64,
    pub digest: String,
}

impl Revision {
    /// Builds the revision for a record about to be written.
    pub fn compute(seq: u64, key: &str, timestamp: DateTime<Utc>, data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        hasher.update(timestamp.timestamp_millis().to_le_bytes());
        hasher.update(data);
        let hex = format!("{:x}", hasher.finalize());

        Self {
            seq,
            digest: hex[..DIGEST_LEN].to_string(),
        }
    }

    /// The revision following `previous`, or the first one.
    pub fn next_seq(previous: Option<&Revision>) -> u64 {
        previous.map_or(1, |r| r.seq + 1)
    }
}

impl Ord for Revision {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seq
            .cmp(&other.seq)
            .then_with(|| self.digest.cmp(&other.digest))
    }
}

impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.seq, self.digest)
    }
}

impl FromStr for Revision {
    type Err = ParseRevisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseRevisionError(s.to_string());
        let (seq, digest) = s.split_once('-').ok_or_else(err)?;
        let seq = seq.parse::<u64>().map_err(|_| err())?;

        if digest.is_empty() || !digest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }

        Ok(Self {
            seq,
            digest: digest.to_string(),
        })
    }
}

/// One stored version of a tile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRecord {
    pub key: String,
    pub blob: TileBlob,
    /// When the data was fetched; the only input to staleness.
    pub timestamp: DateTime<Utc>,
    pub revision: Revision,
}

impl TileRecord {
    /// Age of the record at `now`, zero if the timestamp is in the future.
    pub fn age(&self, now: DateTime<Utc>) -> chrono::Duration {
        (now - self.timestamp).max(chrono::Duration::zero())
    }
}

/// Live record count and payload size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub entries: u64,
    pub bytes: u64,
}

impl fmt::Display for StoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entries, {} bytes", self.entries, self.bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_revision_display_and_parse() {
        let rev = Revision::compute(3, "http://a/1/2/3.png", ts(1_000), b"data");
        let text = rev.to_string();

        assert!(text.starts_with("3-"));
        assert_eq!(text.len(), 2 + DIGEST_LEN);
        assert_eq!(text.parse::<Revision>().unwrap(), rev);
    }

    #[test]
    fn test_revision_digest_depends_on_content() {
        let a = Revision::compute(1, "k", ts(0), b"one");
        let b = Revision::compute(1, "k", ts(0), b"two");
        let c = Revision::compute(1, "k", ts(1), b"one");
        assert_ne!(a.digest, b.digest);
        assert_ne!(a.digest, c.digest);
    }

    #[test]
    fn test_revision_parse_rejects_garbage() {
        for bad in ["", "12", "x-abc", "1-", "1-xyz"] {
            assert!(bad.parse::<Revision>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_revision_orders_by_seq() {
        let mut revs = vec![
            Revision::compute(10, "k", ts(0), b""),
            Revision::compute(2, "k", ts(0), b""),
            Revision::compute(9, "k", ts(0), b""),
        ];
        revs.sort();
        let seqs: Vec<u64> = revs.iter().map(|r| r.seq).collect();
        assert_eq!(seqs, vec![2, 9, 10]);
    }

    #[test]
    fn test_next_seq() {
        assert_eq!(Revision::next_seq(None), 1);
        let rev = Revision::compute(4, "k", ts(0), b"");
        assert_eq!(Revision::next_seq(Some(&rev)), 5);
    }

    #[test]
    fn test_record_age_clamps_future() {
        let record = TileRecord {
            key: "k".to_string(),
            blob: TileBlob::new("image/png", vec![1]),
            timestamp: ts(5_000),
            revision: Revision::compute(1, "k", ts(5_000), &[1]),
        };
        assert_eq!(record.age(ts(6_500)).num_milliseconds(), 1_500);
        assert_eq!(record.age(ts(0)), chrono::Duration::zero());
    }
}
