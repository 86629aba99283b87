/// History log: bounded ring buffer of completed generations.
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::schema::record::SelectionRecord;

pub const DEFAULT_CAPACITY: usize = 100;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history corrupted: expected sequence {expected}, found {found}")]
    Corrupted { expected: u64, found: u64 },
    #[error("history is fenced after a corruption was detected; restart required")]
    Fenced,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("RON serialization error: {0}")]
    RonSerialize(#[from] ron::Error),
}

/// On-disk shape of a saved history, oldest record first.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedHistory {
    capacity: usize,
    records: Vec<SelectionRecord>,
}

/// Append-only, capacity-bounded sequence of [`SelectionRecord`]s.
///
/// Records live in a fixed array of `capacity` slots addressed from `head`
/// (the oldest record). Appending to a full log overwrites the head slot and
/// advances it, so eviction order is always oldest-first.
#[derive(Debug)]
pub struct HistoryLog {
    slots: Vec<Option<SelectionRecord>>,
    head: usize,
    len: usize,
    next_sequence: u64,
    fenced: AtomicBool,
}

impl HistoryLog {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
            next_sequence: 0,
            fenced: AtomicBool::new(false),
        }
    }

    /// Rebuild a log from previously saved records (oldest first).
    ///
    /// Only the newest `capacity` records are kept. Sequence numbers are not
    /// checked here; [`HistoryLog::verify`] catches a damaged history on
    /// first read.
    pub fn restore(capacity: usize, records: Vec<SelectionRecord>) -> Self {
        let mut log = Self::new(capacity);
        let skip = records.len().saturating_sub(capacity);
        for record in records.into_iter().skip(skip) {
            log.next_sequence = record.sequence.wrapping_add(1);
            log.push_slot(record);
        }
        log
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Sequence number the next appended record must carry.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn is_fenced(&self) -> bool {
        self.fenced.load(Ordering::Acquire)
    }

    /// Append a record at the tail, evicting the oldest when full.
    ///
    /// The record's sequence number must equal [`next_sequence`]; anything
    /// else means two writers raced past the lock discipline, so the log
    /// fences itself and refuses all further writes.
    ///
    /// [`next_sequence`]: HistoryLog::next_sequence
    pub fn append(&mut self, record: SelectionRecord) -> Result<(), HistoryError> {
        if self.is_fenced() {
            return Err(HistoryError::Fenced);
        }
        if record.sequence != self.next_sequence {
            self.fence();
            tracing::error!(
                expected = self.next_sequence,
                found = record.sequence,
                "out-of-order history append"
            );
            return Err(HistoryError::Corrupted {
                expected: self.next_sequence,
                found: record.sequence,
            });
        }
        self.next_sequence += 1;
        self.push_slot(record);
        Ok(())
    }

    fn push_slot(&mut self, record: SelectionRecord) {
        let capacity = self.capacity();
        if self.len == capacity {
            self.slots[self.head] = Some(record);
            self.head = (self.head + 1) % capacity;
        } else {
            let tail = (self.head + self.len) % capacity;
            self.slots[tail] = Some(record);
            self.len += 1;
        }
    }

    /// The record `back` steps from the newest (0 = newest).
    fn nth_newest(&self, back: usize) -> Option<&SelectionRecord> {
        if back >= self.len {
            return None;
        }
        let idx = (self.head + self.len - 1 - back) % self.capacity();
        self.slots[idx].as_ref()
    }

    /// The last `n` records, most recent first.
    pub fn window(&self, n: usize) -> Window<'_> {
        Window {
            log: self,
            next: 0,
            end: n.min(self.len),
        }
    }

    pub fn latest(&self) -> Option<&SelectionRecord> {
        self.nth_newest(0)
    }

    /// All records, oldest first.
    pub fn iter_chronological(&self) -> impl Iterator<Item = &SelectionRecord> + '_ {
        (0..self.len).rev().filter_map(move |back| self.nth_newest(back))
    }

    /// Generations elapsed since `option` was last chosen in `category`:
    /// 0 if the newest record chose it, `None` if no retained record did.
    pub fn last_used_at(&self, category: &str, option: &str) -> Option<usize> {
        self.window(self.len)
            .position(|record| record.chose(category, option))
    }

    /// [`last_used_at`] for every option seen in `category`, in one pass.
    ///
    /// [`last_used_at`]: HistoryLog::last_used_at
    pub fn distances(&self, category: &str) -> FxHashMap<&str, usize> {
        let mut out = FxHashMap::default();
        for (distance, record) in self.window(self.len).enumerate() {
            if let Some(option) = record.option_for(category) {
                out.entry(option).or_insert(distance);
            }
        }
        out
    }

    /// Options chosen in `category` by the last `n` records.
    pub fn recently_used(&self, category: &str, n: usize) -> BTreeSet<String> {
        self.window(n)
            .filter_map(|record| record.option_for(category))
            .map(str::to_string)
            .collect()
    }

    /// Check that retained sequence numbers are strictly consecutive and end
    /// just before `next_sequence`. A failure fences the log.
    pub fn verify(&self) -> Result<(), HistoryError> {
        if self.is_fenced() {
            return Err(HistoryError::Fenced);
        }
        let mut expected: Option<u64> = None;
        for record in self.iter_chronological() {
            if let Some(expected) = expected {
                if record.sequence != expected {
                    return Err(self.corrupted(expected, record.sequence));
                }
            }
            expected = Some(record.sequence.wrapping_add(1));
        }
        if let Some(expected) = expected {
            if expected != self.next_sequence {
                return Err(self.corrupted(self.next_sequence, expected));
            }
        }
        Ok(())
    }

    fn corrupted(&self, expected: u64, found: u64) -> HistoryError {
        self.fence();
        tracing::error!(expected, found, "history sequence gap detected; writes fenced");
        HistoryError::Corrupted { expected, found }
    }

    fn fence(&self) {
        self.fenced.store(true, Ordering::Release);
    }

    /// Serialize the retained records to a RON string.
    pub fn to_ron(&self) -> Result<String, HistoryError> {
        let persisted = PersistedHistory {
            capacity: self.capacity(),
            records: self.iter_chronological().cloned().collect(),
        };
        Ok(ron::ser::to_string_pretty(
            &persisted,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Parse a history saved by [`HistoryLog::to_ron`].
    pub fn parse_ron(input: &str) -> Result<HistoryLog, HistoryError> {
        let persisted: PersistedHistory = ron::from_str(input)?;
        Ok(Self::restore(persisted.capacity.max(1), persisted.records))
    }

    pub fn save_ron(&self, path: &Path) -> Result<(), HistoryError> {
        std::fs::write(path, self.to_ron()?)?;
        Ok(())
    }

    pub fn load_ron(path: &Path) -> Result<HistoryLog, HistoryError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }
}

/// Most-recent-first view over the tail of a [`HistoryLog`].
///
/// Borrowing the log keeps the view consistent: no append can land while it
/// is alive.
#[derive(Debug)]
pub struct Window<'a> {
    log: &'a HistoryLog,
    next: usize,
    end: usize,
}

impl<'a> Iterator for Window<'a> {
    type Item = &'a SelectionRecord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let record = self.log.nth_newest(self.next);
        self.next += 1;
        record
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.end - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Window<'_> {}
