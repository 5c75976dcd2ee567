//! Per-record-kind bookkeeping for interleaved data regions.
//!
//! A data group stores the rows of all its channel groups in one region. With
//! record ids enabled, every row starts with a tag naming its channel group,
//! so rows of different kinds interleave freely. [`RecordCountTable`] keeps a
//! running count and the offset of the most recent row for each
//! `(group, record id)` pair. The table is never persisted; it is rebuilt by
//! scanning or maintained while appending.

use crate::{Error, Result};
use alloc::collections::BTreeMap;
use alloc::collections::btree_map;

/// Identifies one record kind within one data group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordKey {
    /// Index of the data group in the file's data group chain.
    pub group: u64,
    /// Record id tagging the rows of one channel group.
    pub record_id: u64,
}

impl RecordKey {
    pub const fn new(group: u64, record_id: u64) -> Self {
        Self { group, record_id }
    }
}

/// Running totals for one record kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RecordCount {
    /// Rows observed so far.
    pub count: u64,
    /// File offset of the most recently observed row.
    pub last_offset: u64,
}

/// Row layout of a data region: record id tagging plus the size of each
/// record kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordLayout {
    /// Number of one-byte record ids per row: 0 (untagged), 1 (leading) or
    /// 2 (leading and trailing).
    pub record_id_count: u16,
    sizes: BTreeMap<u64, usize>,
}

impl RecordLayout {
    pub fn new(record_id_count: u16) -> Self {
        Self {
            record_id_count,
            sizes: BTreeMap::new(),
        }
    }

    /// Declare the payload size of rows tagged `record_id`.
    pub fn insert(&mut self, record_id: u64, size: usize) {
        self.sizes.insert(record_id, size);
    }

    /// Payload size of `record_id`, without the tags.
    pub fn size_of(&self, record_id: u64) -> Option<usize> {
        self.sizes.get(&record_id).copied()
    }

    /// Bytes taken by the record id tags of one row.
    pub fn tag_len(&self) -> usize {
        usize::from(self.record_id_count.min(2))
    }

    /// Full row length for `record_id`, tags included.
    pub fn row_len(&self, record_id: u64) -> Option<usize> {
        self.size_of(record_id).map(|size| size + self.tag_len())
    }

    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// The record id of an untagged region, which may hold a single kind.
    fn sole_record_id(&self) -> Result<u64> {
        let mut ids = self.sizes.keys();
        match (ids.next(), ids.next()) {
            (Some(id), None) => Ok(*id),
            _ => Err(Error::BlockSerializationError(alloc::format!(
                "untagged data region needs exactly one record kind, layout has {}",
                self.sizes.len()
            ))),
        }
    }
}

/// Outcome of a scan over a data region.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Rows observed.
    pub rows: u64,
    /// Bytes consumed from the start of the stream.
    pub consumed: u64,
}

/// Counts and last offsets keyed by [`RecordKey`], in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordCountTable {
    entries: BTreeMap<RecordKey, RecordCount>,
}

impl RecordCountTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one row of kind `key` at `offset`.
    ///
    /// Returns the 0-based slot of the row among rows of the same kind.
    pub fn observe(&mut self, key: RecordKey, offset: u64) -> u64 {
        let entry = self.entries.entry(key).or_default();
        let slot = entry.count;
        entry.count += 1;
        entry.last_offset = offset;
        slot
    }

    pub fn get(&self, key: RecordKey) -> Option<&RecordCount> {
        self.entries.get(&key)
    }

    /// Rows observed for `key`, 0 when never seen.
    pub fn count(&self, key: RecordKey) -> u64 {
        self.entries.get(&key).map_or(0, |entry| entry.count)
    }

    /// Offset of the last row observed for `key`.
    pub fn last_offset(&self, key: RecordKey) -> Option<u64> {
        self.entries.get(&key).map(|entry| entry.last_offset)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, RecordKey, RecordCount> {
        self.entries.iter()
    }

    /// Entries of one data group, ordered by record id.
    pub fn group(&self, group: u64) -> impl Iterator<Item = (&RecordKey, &RecordCount)> + '_ {
        self.entries
            .range(RecordKey::new(group, 0)..=RecordKey::new(group, u64::MAX))
    }

    /// Forget every entry of one data group.
    pub fn clear_group(&mut self, group: u64) {
        self.entries.retain(|key, _| key.group != group);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Observe every row of `stream`, which starts at file offset
    /// `base_offset`.
    ///
    /// The stream must consist of whole rows only. An unknown record id
    /// fails with [`Error::UnknownRecordId`], a partial trailing row with
    /// [`Error::TruncatedRead`].
    pub fn scan(
        &mut self,
        stream: &[u8],
        base_offset: u64,
        group: u64,
        layout: &RecordLayout,
    ) -> Result<ScanSummary> {
        self.walk(stream, base_offset, group, layout, false)
    }

    /// Like [`RecordCountTable::scan`], but stops quietly at the first row
    /// that is unknown or incomplete.
    ///
    /// Used for regions whose extent is not recorded, where the rows are
    /// followed by unrelated bytes.
    pub fn scan_prefix(
        &mut self,
        stream: &[u8],
        base_offset: u64,
        group: u64,
        layout: &RecordLayout,
    ) -> Result<ScanSummary> {
        self.walk(stream, base_offset, group, layout, true)
    }

    fn walk(
        &mut self,
        stream: &[u8],
        base_offset: u64,
        group: u64,
        layout: &RecordLayout,
        stop_early: bool,
    ) -> Result<ScanSummary> {
        let untagged = match layout.record_id_count {
            0 => Some(layout.sole_record_id()?),
            _ => None,
        };
        let mut summary = ScanSummary::default();
        let mut pos = 0usize;

        while pos < stream.len() {
            let offset = base_offset + pos as u64;
            let record_id = untagged.unwrap_or(u64::from(stream[pos]));
            let Some(row_len) = layout.row_len(record_id) else {
                if stop_early {
                    break;
                }
                return Err(Error::UnknownRecordId { offset, record_id });
            };
            let available = stream.len() - pos;
            if row_len > available {
                if stop_early {
                    break;
                }
                return Err(Error::TruncatedRead {
                    offset,
                    expected: row_len as u64,
                    actual: available as u64,
                });
            }
            if row_len == 0 {
                // Zero-sized untagged rows would never advance.
                break;
            }

            let slot = self.observe(RecordKey::new(group, record_id), offset);
            tracing::trace!(group, record_id, offset, slot, "record");
            summary.rows += 1;
            pos += row_len;
        }

        summary.consumed = pos as u64;
        Ok(summary)
    }
}

impl<'a> IntoIterator for &'a RecordCountTable {
    type Item = (&'a RecordKey, &'a RecordCount);
    type IntoIter = btree_map::Iter<'a, RecordKey, RecordCount>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;
    use alloc::vec::Vec;

    const A: u8 = 1;
    const B: u8 = 2;

    fn layout_of(record_id_count: u16, records: &[(u64, usize)]) -> RecordLayout {
        let mut layout = RecordLayout::new(record_id_count);
        for &(record_id, size) in records {
            layout.insert(record_id, size);
        }
        layout
    }

    fn layout() -> RecordLayout {
        layout_of(1, &[(1, 3), (2, 5)])
    }

    fn row(id: u8) -> Vec<u8> {
        let size = layout().size_of(u64::from(id)).unwrap();
        let mut row = vec![id];
        row.extend(core::iter::repeat_n(0xEE, size));
        row
    }

    /// Offsets of every row tagged `id`, found by stepping through rows one
    /// at a time.
    fn naive_offsets(stream: &[u8], base: u64, id: u8) -> Vec<u64> {
        let layout = layout();
        let mut offsets = Vec::new();
        let mut pos = 0;
        while pos < stream.len() {
            let tag = stream[pos];
            if tag == id {
                offsets.push(base + pos as u64);
            }
            pos += layout.row_len(u64::from(tag)).unwrap();
        }
        offsets
    }

    #[test]
    fn interleaved_rows_match_naive_rescan() {
        let stream: Vec<u8> = [A, B, A, A, B].iter().flat_map(|&id| row(id)).collect();
        let base = 4096;
        let mut table = RecordCountTable::new();
        let summary = table.scan(&stream, base, 0, &layout()).unwrap();
        assert_eq!(summary.rows, 5);
        assert_eq!(summary.consumed, stream.len() as u64);

        let a = RecordKey::new(0, 1);
        let b = RecordKey::new(0, 2);
        assert_eq!(table.count(a), 3);
        assert_eq!(table.count(b), 2);

        let offsets_a = naive_offsets(&stream, base, A);
        let offsets_b = naive_offsets(&stream, base, B);
        assert_eq!(offsets_a.len() as u64, table.count(a));
        assert_eq!(offsets_b.len() as u64, table.count(b));
        assert_eq!(table.last_offset(a), offsets_a.last().copied());
        assert_eq!(table.last_offset(b), offsets_b.last().copied());
        // Rows start at 0, 4, 10, 14 and 18.
        assert_eq!(table.last_offset(a), Some(base + 4 + 6 + 4));
    }

    #[test]
    fn observe_hands_out_sequential_slots() {
        let mut table = RecordCountTable::new();
        let key = RecordKey::new(3, 7);
        assert_eq!(table.observe(key, 100), 0);
        assert_eq!(table.observe(key, 120), 1);
        assert_eq!(table.observe(RecordKey::new(3, 8), 140), 0);
        assert_eq!(table.observe(key, 160), 2);
        assert_eq!(table.get(key), Some(&RecordCount { count: 3, last_offset: 160 }));
    }

    #[test]
    fn keys_do_not_collide_at_extremes() {
        let mut table = RecordCountTable::new();
        table.observe(RecordKey::new(u64::MAX, 0), 8);
        table.observe(RecordKey::new(0, u64::MAX), 16);
        table.observe(RecordKey::new(u64::MAX, u64::MAX), 24);
        assert_eq!(table.len(), 3);
        assert_eq!(table.count(RecordKey::new(u64::MAX, 0)), 1);
        assert_eq!(table.group(u64::MAX).count(), 2);
        assert_eq!(table.group(0).count(), 1);
    }

    #[test]
    fn group_iteration_and_clearing() {
        let mut table = RecordCountTable::new();
        table.observe(RecordKey::new(1, 2), 0);
        table.observe(RecordKey::new(0, 9), 0);
        table.observe(RecordKey::new(1, 1), 0);
        let ids: Vec<u64> = table.group(1).map(|(key, _)| key.record_id).collect();
        assert_eq!(ids, vec![1, 2]);
        table.clear_group(1);
        assert_eq!(table.len(), 1);
        table.clear();
        assert!(table.is_empty());
    }

    #[test]
    fn strict_scan_rejects_unknown_ids_and_partial_rows() {
        let mut stream = row(A);
        stream.push(9);
        let mut table = RecordCountTable::new();
        match table.scan(&stream, 0, 0, &layout()) {
            Err(Error::UnknownRecordId { offset, record_id }) => {
                assert_eq!(offset, 4);
                assert_eq!(record_id, 9);
            }
            other => panic!("unexpected {other:?}"),
        }

        let mut stream = row(A);
        stream.extend_from_slice(&[B, 0, 0]);
        let mut table = RecordCountTable::new();
        assert!(matches!(
            table.scan(&stream, 0, 0, &layout()),
            Err(Error::TruncatedRead { offset: 4, expected: 6, actual: 3 })
        ));
    }

    #[test]
    fn prefix_scan_stops_at_foreign_bytes() {
        let mut stream: Vec<u8> = [A, B].iter().flat_map(|&id| row(id)).collect();
        stream.extend_from_slice(b"##TX");
        let mut table = RecordCountTable::new();
        let summary = table.scan_prefix(&stream, 0, 0, &layout()).unwrap();
        assert_eq!(summary, ScanSummary { rows: 2, consumed: 10 });
    }

    #[test]
    fn untagged_and_double_tagged_rows() {
        let untagged = layout_of(0, &[(0, 4)]);
        let mut table = RecordCountTable::new();
        let summary = table.scan(&[0u8; 12], 0, 2, &untagged).unwrap();
        assert_eq!(summary.rows, 3);
        assert_eq!(table.last_offset(RecordKey::new(2, 0)), Some(8));

        let double = layout_of(2, &[(5, 2)]);
        let mut table = RecordCountTable::new();
        let stream = [5, 0xAA, 0xBB, 5, 5, 0xCC, 0xDD, 5];
        table.scan(&stream, 0, 0, &double).unwrap();
        assert_eq!(table.count(RecordKey::new(0, 5)), 2);
        assert_eq!(table.last_offset(RecordKey::new(0, 5)), Some(4));

        let ambiguous = layout_of(0, &[(0, 4), (1, 4)]);
        assert!(RecordCountTable::new().scan(&[0u8; 4], 0, 0, &ambiguous).is_err());
    }
}
