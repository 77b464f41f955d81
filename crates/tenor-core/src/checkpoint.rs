//! # Checkpoints
//!
//! Time is cut into buckets of `checkpoint_duration` seconds. A checkpoint
//! records the vault share price the first time its bucket is touched, the
//! bonds maturing at its timestamp and a time-weighted spot price.
//!
//! Checkpoints are stored in an append-only arena indexed by bucket number,
//! so lookups never scan wall-clock time. The arena starts at the pool's
//! first checkpoint and only grows forward.

use crate::errors::{CoreResult, TenorError};
use crate::math::FixedPoint;

/// Start of the bucket containing `time`
pub fn latest_checkpoint(time: u64, checkpoint_duration: u64) -> u64 {
    time - time % checkpoint_duration
}

#[cfg_attr(feature = "client", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Checkpoint {
    /// Vault share price at first touch; zero until minted, immutable after
    pub vault_share_price: FixedPoint,
    /// Long bonds maturing at this checkpoint
    pub longs_maturing: FixedPoint,
    /// Short bonds maturing at this checkpoint
    pub shorts_maturing: FixedPoint,
    /// Time-weighted spot price within the bucket
    pub weighted_spot_price: FixedPoint,
    pub last_weighted_spot_price_update_time: u64,
}

impl Checkpoint {
    pub fn is_minted(&self) -> bool {
        !self.vault_share_price.is_zero()
    }

    /// Net long bonds maturing here (raw 18 decimals, negative when net short)
    pub fn exposure(&self) -> CoreResult<i128> {
        let longs = self.longs_maturing.to_signed()?;
        let shorts = self.shorts_maturing.to_signed()?;
        longs.checked_sub(shorts).ok_or(TenorError::ArithmeticOverflow)
    }
}

/// Arena of checkpoints keyed by bucket number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckpointLedger {
    checkpoint_duration: u64,
    /// Bucket number of `entries[0]`
    origin_bucket: u64,
    entries: Vec<Checkpoint>,
}

impl CheckpointLedger {
    pub fn new(checkpoint_duration: u64) -> Self {
        Self {
            checkpoint_duration,
            origin_bucket: 0,
            entries: Vec::new(),
        }
    }

    pub fn checkpoint_duration(&self) -> u64 {
        self.checkpoint_duration
    }

    /// Bucket number of a bucket-aligned time
    pub fn bucket(&self, time: u64) -> CoreResult<u64> {
        if self.checkpoint_duration == 0 || time % self.checkpoint_duration != 0 {
            return Err(TenorError::InvalidCheckpointTime);
        }
        Ok(time / self.checkpoint_duration)
    }

    /// Timestamp of the earliest stored bucket
    pub fn origin(&self) -> Option<u64> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.origin_bucket * self.checkpoint_duration)
    }

    pub fn get(&self, time: u64) -> Option<&Checkpoint> {
        let bucket = self.bucket(time).ok()?;
        let offset = bucket.checked_sub(self.origin_bucket)?;
        self.entries.get(offset as usize)
    }

    /// Stored checkpoint or an unminted default
    pub fn get_or_default(&self, time: u64) -> Checkpoint {
        self.get(time).copied().unwrap_or_default()
    }

    /// Store a checkpoint. The first insert fixes the origin; later ones
    /// may not precede it.
    pub fn insert(&mut self, time: u64, checkpoint: Checkpoint) -> CoreResult<()> {
        let bucket = self.bucket(time)?;

        if self.entries.is_empty() {
            self.origin_bucket = bucket;
        } else if bucket < self.origin_bucket {
            return Err(TenorError::InvalidCheckpointTime);
        }

        let offset = (bucket - self.origin_bucket) as usize;
        if offset >= self.entries.len() {
            self.entries.resize(offset + 1, Checkpoint::default());
        }
        self.entries[offset] = checkpoint;

        Ok(())
    }

    /// Minted checkpoints in time order
    pub fn iter_minted(&self) -> impl Iterator<Item = (u64, &Checkpoint)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, checkpoint)| checkpoint.is_minted())
            .map(move |(offset, checkpoint)| {
                ((self.origin_bucket + offset as u64) * self.checkpoint_duration, checkpoint)
            })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minted(price: u64) -> Checkpoint {
        Checkpoint {
            vault_share_price: FixedPoint::from_int(price),
            ..Default::default()
        }
    }

    #[test]
    fn test_latest_checkpoint_floors_to_bucket() {
        assert_eq!(latest_checkpoint(86_400 * 3 + 17, 86_400), 86_400 * 3);
        assert_eq!(latest_checkpoint(86_400, 86_400), 86_400);
    }

    #[test]
    fn test_insert_and_lookup_by_bucket() {
        let mut ledger = CheckpointLedger::new(10);
        ledger.insert(100, minted(1)).unwrap();
        ledger.insert(130, minted(2)).unwrap();

        assert_eq!(ledger.get(100).unwrap().vault_share_price, FixedPoint::from_int(1));
        assert!(!ledger.get(110).unwrap().is_minted());
        assert_eq!(ledger.get(130).unwrap().vault_share_price, FixedPoint::from_int(2));
        assert!(ledger.get(140).is_none());
        assert!(ledger.get(105).is_none());
        assert_eq!(ledger.len(), 4);
    }

    #[test]
    fn test_insert_before_origin_rejected() {
        let mut ledger = CheckpointLedger::new(10);
        assert_eq!(ledger.origin(), None);
        ledger.insert(100, minted(1)).unwrap();

        assert_eq!(ledger.insert(70, minted(3)), Err(TenorError::InvalidCheckpointTime));
        assert_eq!(ledger.origin(), Some(100));
        assert_eq!(ledger.len(), 1);
        assert!(ledger.get(70).is_none());
    }

    #[test]
    fn test_unaligned_time_rejected() {
        let mut ledger = CheckpointLedger::new(10);
        assert_eq!(ledger.insert(15, minted(1)), Err(TenorError::InvalidCheckpointTime));
    }

    #[test]
    fn test_iter_minted_skips_gaps() {
        let mut ledger = CheckpointLedger::new(10);
        ledger.insert(100, minted(1)).unwrap();
        ledger.insert(140, minted(5)).unwrap();

        let minted_times: Vec<u64> = ledger.iter_minted().map(|(time, _)| time).collect();
        assert_eq!(minted_times, vec![100, 140]);
    }

    #[test]
    fn test_exposure_is_signed() {
        let checkpoint = Checkpoint {
            longs_maturing: FixedPoint::from_int(3),
            shorts_maturing: FixedPoint::from_int(5),
            ..Default::default()
        };
        assert_eq!(checkpoint.exposure().unwrap(), -2 * crate::constants::ONE as i128);
    }
}
