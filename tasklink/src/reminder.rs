//! Daily reminder bookkeeping.
//!
//! Only the "when was this user last reminded" record and the due check live
//! here; composing and delivering the reminder is the host's job.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use tasklink_proto::task::Timestamp;

use crate::kv::KvStore;
use crate::store::{StoreError, reminder_key};

const ONE_HOUR_MS: u64 = 60 * 60 * 1000;

/// Returns `true` if a user last reminded at `last` should be reminded again
/// at `now`.
///
/// A reminder is due once at least an hour has passed and `now` falls on a
/// different calendar day than `last` in the user's timezone, given as
/// minutes east of UTC. An out-of-range offset is treated as UTC. A user
/// never reminded before is always due.
#[must_use]
pub fn is_reminder_due(now: Timestamp, last: Option<Timestamp>, utc_offset_minutes: i32) -> bool {
    let Some(last) = last else {
        return true;
    };
    if now.as_millis().saturating_sub(last.as_millis()) < ONE_HOUR_MS {
        return false;
    }

    let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
        .unwrap_or_else(|| Utc.fix());
    local_day(now, offset) != local_day(last, offset)
}

fn local_day(at: Timestamp, offset: FixedOffset) -> Option<NaiveDate> {
    let millis = i64::try_from(at.as_millis()).ok()?;
    DateTime::from_timestamp_millis(millis).map(|utc| utc.with_timezone(&offset).date_naive())
}

/// Per-user record of the last reminder time.
///
/// Stored as decimal milliseconds under `reminder_<userId>`.
pub struct ReminderStore<K> {
    kv: Arc<K>,
}

impl<K> Clone for ReminderStore<K> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
        }
    }
}

impl<K: KvStore> ReminderStore<K> {
    /// Creates a reminder store over `kv`.
    #[must_use]
    pub const fn new(kv: Arc<K>) -> Self {
        Self { kv }
    }

    /// When `user_id` was last reminded, if ever.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageFailure`] if the record cannot be read
    /// or is not a decimal timestamp.
    pub async fn last_reminder(&self, user_id: &str) -> Result<Option<Timestamp>, StoreError> {
        let key = reminder_key(user_id);
        self.kv
            .get(&key)
            .await?
            .map(|bytes| parse_millis(&key, &bytes))
            .transpose()
    }

    /// Records that `user_id` was reminded at `at`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageFailure`] if the write fails.
    pub async fn record_reminder(&self, user_id: &str, at: Timestamp) -> Result<(), StoreError> {
        self.kv
            .set(&reminder_key(user_id), at.as_millis().to_string().into_bytes())
            .await?;
        Ok(())
    }

    /// Records a reminder at `now` only if one is due, and reports whether
    /// it did.
    ///
    /// The record is updated with compare-and-set, so of several callers
    /// racing on the same user at most one gets `true`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StorageFailure`] if the record cannot be read,
    /// parsed or written.
    pub async fn claim_if_due(
        &self,
        user_id: &str,
        now: Timestamp,
        utc_offset_minutes: i32,
    ) -> Result<bool, StoreError> {
        let key = reminder_key(user_id);
        let current = self.kv.get(&key).await?;
        let last = current
            .as_deref()
            .map(|bytes| parse_millis(&key, bytes))
            .transpose()?;

        if !is_reminder_due(now, last, utc_offset_minutes) {
            return Ok(false);
        }

        let claimed = self
            .kv
            .compare_and_set(
                &key,
                current.as_deref(),
                now.as_millis().to_string().into_bytes(),
            )
            .await?;
        if !claimed {
            tracing::debug!(user_id, "reminder already claimed by another caller");
        }
        Ok(claimed)
    }
}

fn parse_millis(key: &str, bytes: &[u8]) -> Result<Timestamp, StoreError> {
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|text| text.trim().parse::<u64>().ok())
        .map(Timestamp::from_millis)
        .ok_or_else(|| StoreError::StorageFailure(format!("{key} is not a timestamp")))
}
