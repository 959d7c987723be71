use super::hash_table::JoinHashTable;
use crate::arrays::bitmap::Bitmap;

/// Tracks which build rows were emitted as part of a match.
///
/// Indexed by 1-based build row id, bit 0 is unused.
#[derive(Debug)]
pub struct BuildOuterJoinTracker {
    visited: Bitmap,
}

impl BuildOuterJoinTracker {
    pub fn new_for_table(table: &JoinHashTable) -> Self {
        BuildOuterJoinTracker {
            visited: Bitmap::new_with_all_false(table.num_rows() + 1),
        }
    }

    #[inline]
    pub fn mark_visited(&mut self, id: usize) {
        self.visited.set_unchecked(id, true);
    }

    pub fn is_visited(&self, id: usize) -> bool {
        self.visited.value(id)
    }

    /// Number of build rows that were never matched.
    pub fn unvisited_count(&self) -> usize {
        // Bit 0 is never set.
        self.visited.len() - 1 - self.visited.count_trues()
    }
}

/// Cursor for emitting unvisited build rows in insertion order.
#[derive(Debug)]
pub struct BuildOuterJoinDrainState {
    /// Next build row id to consider.
    next_id: usize,
}

impl Default for BuildOuterJoinDrainState {
    fn default() -> Self {
        BuildOuterJoinDrainState { next_id: 1 }
    }
}

impl BuildOuterJoinDrainState {
    /// Fill `rows` with the physical indices of up to `capacity` unvisited build
    /// rows, returning how many were written.
    ///
    /// Returns 0 once every row has been drained.
    pub fn drain_next(
        &mut self,
        tracker: &BuildOuterJoinTracker,
        capacity: usize,
        rows: &mut Vec<usize>,
    ) -> usize {
        rows.clear();
        let num_ids = tracker.visited.len();

        while self.next_id < num_ids && rows.len() < capacity {
            if !tracker.is_visited(self.next_id) {
                rows.push(self.next_id - 1);
            }
            self.next_id += 1;
        }

        rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::generate_batch;

    fn table_with_rows(n: i64) -> JoinHashTable {
        let mut table = JoinHashTable::try_new(&[DataType::Int64], &[0], &[0], 4, false).unwrap();
        table
            .insert_batch(&generate_batch!((0..n).collect::<Vec<_>>()))
            .unwrap();
        table
    }

    #[test]
    fn drain_skips_visited() {
        let table = table_with_rows(5);
        let mut tracker = BuildOuterJoinTracker::new_for_table(&table);
        tracker.mark_visited(2);
        tracker.mark_visited(5);
        assert_eq!(3, tracker.unvisited_count());

        let mut drain = BuildOuterJoinDrainState::default();
        let mut rows = Vec::new();

        assert_eq!(2, drain.drain_next(&tracker, 2, &mut rows));
        assert_eq!(vec![0, 2], rows);
        assert_eq!(1, drain.drain_next(&tracker, 2, &mut rows));
        assert_eq!(vec![3], rows);
        assert_eq!(0, drain.drain_next(&tracker, 2, &mut rows));
        assert_eq!(0, drain.drain_next(&tracker, 2, &mut rows));
    }

    #[test]
    fn drain_empty_table() {
        let table = table_with_rows(0);
        let tracker = BuildOuterJoinTracker::new_for_table(&table);
        assert_eq!(0, tracker.unvisited_count());

        let mut rows = Vec::new();
        let mut drain = BuildOuterJoinDrainState::default();
        assert_eq!(0, drain.drain_next(&tracker, 16, &mut rows));
    }
}
