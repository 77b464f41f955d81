//! # Work Unit
//!
//! Staging area for one pool operation. The unit holds a copy of the pool
//! state, an overlay of the checkpoints it touched and the effects it issued.
//! Nothing reaches the pool until [`WorkUnit::commit`] hands the changes
//! back; dropping the unit is the rollback.

use std::collections::BTreeMap;

use tracing::trace;

use crate::checkpoint::{Checkpoint, CheckpointLedger};
use crate::errors::{CoreResult, TenorError};
use crate::market::PoolView;
use crate::math::FixedPoint;
use crate::types::{Effect, PoolConfig, PoolState};

// ============================================================================
// Staged Changes
// ============================================================================

/// Everything a successful operation writes back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagedChanges {
    pub state: PoolState,
    /// Touched checkpoints keyed by timestamp
    pub checkpoints: BTreeMap<u64, Checkpoint>,
    pub effects: Vec<Effect>,
}

// ============================================================================
// Work Unit
// ============================================================================

pub struct WorkUnit<'a> {
    config: &'a PoolConfig,
    committed_checkpoints: &'a CheckpointLedger,
    /// State as loaded, for change detection
    original_state: PoolState,
    state: PoolState,
    pending_checkpoints: BTreeMap<u64, Checkpoint>,
    effects: Vec<Effect>,
    now: u64,
    vault_share_price: FixedPoint,
    committed: bool,
}

impl<'a> WorkUnit<'a> {
    pub fn new(
        config: &'a PoolConfig,
        state: PoolState,
        checkpoints: &'a CheckpointLedger,
        now: u64,
        vault_share_price: FixedPoint,
    ) -> Self {
        Self {
            config,
            committed_checkpoints: checkpoints,
            original_state: state,
            state,
            pending_checkpoints: BTreeMap::new(),
            effects: Vec::new(),
            now,
            vault_share_price,
            committed: false,
        }
    }

    pub fn config(&self) -> &'a PoolConfig {
        self.config
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn vault_share_price(&self) -> FixedPoint {
        self.vault_share_price
    }

    // ========================================================================
    // Pool State
    // ========================================================================

    pub fn state(&self) -> &PoolState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut PoolState {
        &mut self.state
    }

    pub fn set_state(&mut self, state: PoolState) {
        self.state = state;
    }

    /// View of the staged state at the unit's instant
    pub fn view(&self) -> PoolView<'a> {
        PoolView::new(self.config, self.state, self.vault_share_price, self.now)
    }

    // ========================================================================
    // Checkpoints
    // ========================================================================

    /// Staged checkpoint, falling back to the committed ledger
    pub fn checkpoint(&self, time: u64) -> Checkpoint {
        self.pending_checkpoints
            .get(&time)
            .copied()
            .unwrap_or_else(|| self.committed_checkpoints.get_or_default(time))
    }

    /// Stage a checkpoint; times before the ledger's origin are rejected
    pub fn set_checkpoint(&mut self, time: u64, checkpoint: Checkpoint) -> CoreResult<()> {
        self.committed_checkpoints.bucket(time)?;
        if self.checkpoint_origin().is_some_and(|origin| time < origin) {
            return Err(TenorError::InvalidCheckpointTime);
        }
        self.pending_checkpoints.insert(time, checkpoint);
        Ok(())
    }

    /// Time of the pool's first checkpoint, once one is committed
    pub fn checkpoint_origin(&self) -> Option<u64> {
        self.committed_checkpoints.origin()
    }

    /// First minted checkpoint strictly after `time`, up to `until` inclusive
    pub fn next_minted_after(&self, time: u64, until: u64) -> Option<(u64, Checkpoint)> {
        let duration = self.config.checkpoint_duration;
        let mut cursor = time.checked_add(duration)?;
        while cursor <= until {
            let checkpoint = self.checkpoint(cursor);
            if checkpoint.is_minted() {
                return Some((cursor, checkpoint));
            }
            cursor = cursor.checked_add(duration)?;
        }
        None
    }

    /// Exposure already maturing at `maturity_time`
    pub fn maturity_exposure(&self, maturity_time: u64) -> CoreResult<i128> {
        self.checkpoint(maturity_time).exposure()
    }

    // ========================================================================
    // Effects
    // ========================================================================

    pub fn push_effect(&mut self, effect: Effect) {
        self.effects.push(effect);
    }

    pub fn effects(&self) -> &[Effect] {
        &self.effects
    }

    pub fn has_changes(&self) -> bool {
        self.state != self.original_state
            || !self.pending_checkpoints.is_empty()
            || !self.effects.is_empty()
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Hand back the staged changes for the pool to write
    pub fn commit(mut self) -> StagedChanges {
        self.committed = true;
        StagedChanges {
            state: self.state,
            checkpoints: std::mem::take(&mut self.pending_checkpoints),
            effects: std::mem::take(&mut self.effects),
        }
    }
}

impl Drop for WorkUnit<'_> {
    fn drop(&mut self) {
        if !self.committed && self.has_changes() {
            trace!(now = self.now, "work unit rolled back");
        }
    }
}
