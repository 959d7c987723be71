use super::hash_table::JoinHashTable;
use super::outer_join_tracker::BuildOuterJoinTracker;
use super::probe::HashJoinProber;

/// Gathers (build, probe) row pairs for a probed batch into fixed capacity
/// staging buffers.
///
/// A single probe batch may produce more pairs than fit in one output batch.
/// The collector remembers where it stopped so the next call picks up from
/// there without emitting anything twice.
#[derive(Debug)]
pub struct HashJoinCollector {
    /// Max number of pairs staged per call.
    capacity: usize,
    /// Per logical probe row, the next build row id to emit.
    head: Vec<usize>,
    /// Logical probe row to continue from.
    resume_row: usize,
    /// If the current probe batch still has rows to visit.
    pending: bool,
    /// Physical build row per staged pair. Only meaningful if the matching
    /// `build_nil` entry is false.
    pub(crate) build_idx: Vec<usize>,
    /// Physical probe row per staged pair.
    pub(crate) probe_idx: Vec<usize>,
    /// If the staged pair has no build row.
    pub(crate) build_nil: Vec<bool>,
}

impl HashJoinCollector {
    pub fn new(capacity: usize) -> Self {
        HashJoinCollector {
            capacity,
            head: Vec::new(),
            resume_row: 0,
            pending: false,
            build_idx: vec![0; capacity],
            probe_idx: vec![0; capacity],
            build_nil: vec![false; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// If there are probe rows left to collect from the last probed batch.
    pub fn has_pending(&self) -> bool {
        self.pending
    }

    /// Begin collecting for a freshly probed batch.
    pub fn start(&mut self, prober: &HashJoinProber) {
        self.head.clear();
        self.head.extend_from_slice(prober.group_ids());
        self.resume_row = 0;
        self.pending = true;
    }

    /// Stage matches for a table that may contain duplicate keys.
    ///
    /// Rows are visited in probe order, and for each probe row every build row
    /// with an equal key is staged, most recently inserted first. With `outer`
    /// set, probe rows without a match are staged once with a nil build side.
    ///
    /// Returns the number of staged pairs. Returning 0 doesn't necessarily mean
    /// the batch is done, check `has_pending`.
    pub fn collect(
        &mut self,
        prober: &HashJoinProber,
        table: &JoinHashTable,
        outer: bool,
        mut tracker: Option<&mut BuildOuterJoinTracker>,
    ) -> usize {
        let mut count = 0;

        while self.resume_row < self.head.len() {
            let row = self.resume_row;
            let probe_row = prober.probe_rows[row];

            if self.head[row] == 0 {
                if outer {
                    if count == self.capacity {
                        return count;
                    }
                    self.stage(count, None, probe_row);
                    count += 1;
                }
                self.resume_row += 1;
                continue;
            }

            while self.head[row] != 0 {
                if count == self.capacity {
                    return count;
                }
                let id = self.head[row];
                self.stage(count, Some(id - 1), probe_row);
                if let Some(tracker) = tracker.as_deref_mut() {
                    tracker.mark_visited(id);
                }
                count += 1;
                self.head[row] = table.next_duplicate(id);
            }

            self.resume_row += 1;
        }

        self.pending = false;
        count
    }

    /// Stage matches for a table where build keys are unique.
    ///
    /// Each probe row produces at most one pair taken directly from the
    /// prober's resolved match.
    pub fn distinct_collect(
        &mut self,
        prober: &HashJoinProber,
        outer: bool,
        mut tracker: Option<&mut BuildOuterJoinTracker>,
    ) -> usize {
        let mut count = 0;
        let group_ids = prober.group_ids();

        while self.resume_row < group_ids.len() {
            let row = self.resume_row;
            let id = group_ids[row];

            if id != 0 || outer {
                if count == self.capacity {
                    return count;
                }
                if id == 0 {
                    self.stage(count, None, prober.probe_rows[row]);
                } else {
                    self.stage(count, Some(id - 1), prober.probe_rows[row]);
                    if let Some(tracker) = tracker.as_deref_mut() {
                        tracker.mark_visited(id);
                    }
                }
                count += 1;
            }

            self.resume_row += 1;
        }

        self.pending = false;
        count
    }

    /// Build rows for the first `count` staged pairs.
    pub fn build_rows(
        &self,
        count: usize,
    ) -> impl ExactSizeIterator<Item = Option<usize>> + Clone + '_ {
        self.build_idx[..count]
            .iter()
            .zip(&self.build_nil[..count])
            .map(|(&idx, &nil)| if nil { None } else { Some(idx) })
    }

    /// Probe rows for the first `count` staged pairs.
    pub fn probe_rows(&self, count: usize) -> &[usize] {
        &self.probe_idx[..count]
    }

    #[inline]
    fn stage(&mut self, pos: usize, build: Option<usize>, probe_row: usize) {
        debug_assert!(pos < self.capacity);
        self.build_idx[pos] = build.unwrap_or(0);
        self.build_nil[pos] = build.is_none();
        self.probe_idx[pos] = probe_row;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::batch::Batch;
    use crate::arrays::datatype::DataType;
    use crate::generate_batch;

    fn probe(table: &JoinHashTable, batch: &Batch) -> HashJoinProber {
        let mut prober = HashJoinProber::default();
        prober.probe(table, batch, &[0]).unwrap();
        prober
    }

    fn staged(collector: &HashJoinCollector, count: usize) -> Vec<(Option<usize>, usize)> {
        collector
            .build_rows(count)
            .zip(collector.probe_rows(count).iter().copied())
            .collect()
    }

    #[test]
    fn collect_duplicates_resumes() {
        let mut table = JoinHashTable::try_new(&[DataType::Int64], &[0], &[], 4, false).unwrap();
        table
            .insert_batch(&generate_batch!([1i64, 2, 1, 1]))
            .unwrap();

        let prober = probe(&table, &generate_batch!([1i64, 2]));
        let mut collector = HashJoinCollector::new(2);
        collector.start(&prober);

        let n = collector.collect(&prober, &table, false, None);
        assert_eq!(vec![(Some(3), 0), (Some(2), 0)], staged(&collector, n));
        assert!(collector.has_pending());

        let n = collector.collect(&prober, &table, false, None);
        assert_eq!(vec![(Some(0), 0), (Some(1), 1)], staged(&collector, n));
        assert!(!collector.has_pending());
    }

    #[test]
    fn collect_outer_nil_not_repeated() {
        let mut table = JoinHashTable::try_new(&[DataType::Int64], &[0], &[], 4, false).unwrap();
        table.insert_batch(&generate_batch!([5i64, 5])).unwrap();

        let prober = probe(&table, &generate_batch!([9i64, 5, 8]));
        let mut collector = HashJoinCollector::new(1);
        collector.start(&prober);

        let mut pairs = Vec::new();
        while collector.has_pending() {
            let n = collector.collect(&prober, &table, true, None);
            pairs.extend(staged(&collector, n));
        }

        assert_eq!(
            vec![(None, 0), (Some(1), 1), (Some(0), 1), (None, 2)],
            pairs
        );
    }

    #[test]
    fn collect_marks_visited() {
        let mut table = JoinHashTable::try_new(&[DataType::Int64], &[0], &[], 4, false).unwrap();
        table
            .insert_batch(&generate_batch!([1i64, 2, 3]))
            .unwrap();
        let mut tracker = BuildOuterJoinTracker::new_for_table(&table);

        let prober = probe(&table, &generate_batch!([3i64, 4]));
        let mut collector = HashJoinCollector::new(8);
        collector.start(&prober);
        collector.collect(&prober, &table, false, Some(&mut tracker));

        assert!(tracker.is_visited(3));
        assert!(!tracker.is_visited(1));
        assert_eq!(2, tracker.unvisited_count());
    }

    #[test]
    fn distinct_collect_resumes() {
        let mut table = JoinHashTable::try_new(&[DataType::Int64], &[0], &[], 4, true).unwrap();
        table
            .insert_batch(&generate_batch!([10i64, 20]))
            .unwrap();

        let prober = probe(&table, &generate_batch!([20i64, 30, 10]));
        let mut collector = HashJoinCollector::new(2);
        collector.start(&prober);

        let n = collector.distinct_collect(&prober, true, None);
        assert_eq!(vec![(Some(1), 0), (None, 1)], staged(&collector, n));
        assert!(collector.has_pending());

        let n = collector.distinct_collect(&prober, true, None);
        assert_eq!(vec![(Some(0), 2)], staged(&collector, n));
        assert!(!collector.has_pending());
    }

    #[test]
    fn distinct_collect_inner_skips_unmatched() {
        let mut table = JoinHashTable::try_new(&[DataType::Int64], &[0], &[], 4, true).unwrap();
        table.insert_batch(&generate_batch!([10i64])).unwrap();

        let prober = probe(&table, &generate_batch!([30i64, 10]));
        let mut collector = HashJoinCollector::new(4);
        collector.start(&prober);

        let n = collector.distinct_collect(&prober, false, None);
        assert_eq!(vec![(Some(0), 1)], staged(&collector, n));
    }
}
