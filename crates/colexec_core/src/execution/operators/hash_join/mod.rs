//! Vectorized equality hash join.
//!
//! The build side is fully consumed into a [`JoinHashTable`] on the first pull.
//! Each probe batch is then resolved against the table by the
//! [`HashJoinProber`], and matching pairs are drained through the
//! [`HashJoinCollector`] in chunks no larger than the output batch size.

mod collect;
mod hash_table;
mod join_type;
mod outer_join_tracker;
mod probe;

use colexec_error::{DbError, OptionExt, Result};
use tracing::{debug, trace};

pub use self::collect::HashJoinCollector;
pub use self::hash_table::JoinHashTable;
pub use self::join_type::JoinType;
pub use self::outer_join_tracker::{BuildOuterJoinDrainState, BuildOuterJoinTracker};
pub use self::probe::HashJoinProber;
use super::{BatchSource, ExecutionProperties};
use crate::arrays::array::Array;
use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;

/// Wiring for one input of the join.
#[derive(Debug)]
pub struct HashJoinSourceSpec {
    /// Input producing batches for this side.
    pub source: Box<dyn BatchSource>,
    /// Columns making up the join key, in key order.
    pub eq_cols: Vec<usize>,
    /// Columns from this side to include in the output.
    pub out_cols: Vec<usize>,
    /// Types of every column produced by `source`.
    pub source_types: Vec<DataType>,
}

impl HashJoinSourceSpec {
    pub fn new(
        source: impl BatchSource + 'static,
        source_types: impl IntoIterator<Item = DataType>,
        eq_cols: impl IntoIterator<Item = usize>,
        out_cols: impl IntoIterator<Item = usize>,
    ) -> Self {
        HashJoinSourceSpec {
            source: Box::new(source),
            eq_cols: eq_cols.into_iter().collect(),
            out_cols: out_cols.into_iter().collect(),
            source_types: source_types.into_iter().collect(),
        }
    }

    fn check_column_indices(&self, side: &str) -> Result<()> {
        for &col in self.eq_cols.iter().chain(&self.out_cols) {
            if col >= self.source_types.len() {
                return Err(DbError::new("Join column index out of range")
                    .with_field("side", side)
                    .with_field("column", col)
                    .with_field("num_columns", self.source_types.len()));
            }
        }
        Ok(())
    }
}

/// Construction-time configuration for a hash join.
#[derive(Debug)]
pub struct HashJoinSpec {
    pub build: HashJoinSourceSpec,
    pub probe: HashJoinSourceSpec,
    /// Emit probe rows without a match, with null build columns.
    pub outer: bool,
    /// Emit build rows that never matched once the probe side is exhausted,
    /// with null probe columns.
    pub build_outer: bool,
    /// Caller asserts the build key is unique. Output is unspecified if it
    /// isn't.
    pub distinct: bool,
    /// Number of hash table buckets.
    pub bucket_count: usize,
}

impl HashJoinSpec {
    pub fn new(
        build: HashJoinSourceSpec,
        probe: HashJoinSourceSpec,
        join_type: JoinType,
        bucket_count: usize,
    ) -> Self {
        HashJoinSpec {
            build,
            probe,
            outer: join_type.is_probe_outer(),
            build_outer: join_type.is_build_outer(),
            distinct: false,
            bucket_count,
        }
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }
}

#[derive(Debug)]
enum HashJoinState {
    /// Build side hasn't been consumed yet.
    Building,
    /// Pulling batches from the probe side.
    Probing,
    /// Probe side exhausted, emitting build rows that never matched.
    Draining(BuildOuterJoinDrainState),
    Finished,
}

/// Pull-based hash join over a build and a probe source.
///
/// Output batches contain the build output columns followed by the probe
/// output columns.
#[derive(Debug)]
pub struct PhysicalHashJoin {
    build: HashJoinSourceSpec,
    probe: HashJoinSourceSpec,
    outer: bool,
    build_outer: bool,
    output_types: Vec<DataType>,
    batch_size: usize,
    state: HashJoinState,
    table: JoinHashTable,
    /// Only set for build-outer joins, after the build completes.
    tracker: Option<BuildOuterJoinTracker>,
    prober: HashJoinProber,
    collector: HashJoinCollector,
    /// Probe batch the collector is currently draining.
    probe_batch: Batch,
    /// Reused buffer for unmatched build rows.
    drain_rows: Vec<usize>,
}

impl PhysicalHashJoin {
    pub fn try_new(spec: HashJoinSpec, props: ExecutionProperties) -> Result<Self> {
        let HashJoinSpec {
            build,
            probe,
            outer,
            build_outer,
            distinct,
            bucket_count,
        } = spec;

        if props.batch_size == 0 {
            return Err(DbError::new("Batch size must be greater than zero"));
        }
        if build.eq_cols.is_empty() {
            return Err(DbError::new("Hash join requires at least one equality column"));
        }
        if build.eq_cols.len() != probe.eq_cols.len() {
            return Err(DbError::new(
                "Build and probe sides have a different number of equality columns",
            )
            .with_field("build", build.eq_cols.len())
            .with_field("probe", probe.eq_cols.len()));
        }

        build.check_column_indices("build")?;
        probe.check_column_indices("probe")?;

        for (&build_col, &probe_col) in build.eq_cols.iter().zip(&probe.eq_cols) {
            let build_type = build.source_types[build_col];
            let probe_type = probe.source_types[probe_col];
            if build_type != probe_type {
                return Err(DbError::new("Equality column types differ")
                    .with_field("build_column", build_col)
                    .with_field("build_type", build_type)
                    .with_field("probe_column", probe_col)
                    .with_field("probe_type", probe_type));
            }
        }

        let table = JoinHashTable::try_new(
            &build.source_types,
            &build.eq_cols,
            &build.out_cols,
            bucket_count,
            distinct,
        )?;

        let output_types = table
            .output_types()
            .chain(probe.out_cols.iter().map(|&col| probe.source_types[col]))
            .collect();

        Ok(PhysicalHashJoin {
            build,
            probe,
            outer,
            build_outer,
            output_types,
            batch_size: props.batch_size,
            state: HashJoinState::Building,
            table,
            tracker: None,
            prober: HashJoinProber::default(),
            collector: HashJoinCollector::new(props.batch_size),
            probe_batch: Batch::empty(),
            drain_rows: Vec::new(),
        })
    }

    /// Types of the columns in every output batch.
    pub fn output_types(&self) -> &[DataType] {
        &self.output_types
    }

    /// If the join has emitted everything it will ever emit.
    pub fn is_finished(&self) -> bool {
        matches!(self.state, HashJoinState::Finished)
    }

    fn build_table(&mut self) -> Result<()> {
        loop {
            let batch = self.build.source.next_batch()?;
            if batch.num_rows() == 0 {
                break;
            }
            batch.check_types(&self.build.source_types)?;
            self.table.insert_batch(&batch)?;
        }

        if self.build_outer {
            self.tracker = Some(BuildOuterJoinTracker::new_for_table(&self.table));
        }

        debug!(
            rows = self.table.num_rows(),
            buckets = self.table.bucket_count,
            distinct = self.table.is_distinct(),
            "hash join build complete"
        );

        self.state = HashJoinState::Probing;
        Ok(())
    }

    /// Make progress on the probe side.
    ///
    /// Returns `None` when no output was produced on this step.
    fn poll_probe(&mut self) -> Result<Option<Batch>> {
        if self.collector.has_pending() {
            let count = if self.table.is_distinct() {
                self.collector
                    .distinct_collect(&self.prober, self.outer, self.tracker.as_mut())
            } else {
                self.collector.collect(
                    &self.prober,
                    &self.table,
                    self.outer,
                    self.tracker.as_mut(),
                )
            };

            if count == 0 {
                return Ok(None);
            }
            return self.project_matches(count).map(Some);
        }

        let batch = self.probe.source.next_batch()?;
        if batch.num_rows() == 0 {
            self.probe_batch = Batch::empty();
            self.state = match &self.tracker {
                Some(tracker) => {
                    debug!(
                        unmatched = tracker.unvisited_count(),
                        "draining unmatched build rows"
                    );
                    HashJoinState::Draining(BuildOuterJoinDrainState::default())
                }
                None => HashJoinState::Finished,
            };
            return Ok(None);
        }

        batch.check_types(&self.probe.source_types)?;
        self.prober.probe(&self.table, &batch, &self.probe.eq_cols)?;
        self.collector.start(&self.prober);
        self.probe_batch = batch;

        Ok(None)
    }

    fn project_matches(&self, count: usize) -> Result<Batch> {
        let mut arrays = self
            .table
            .take_output_columns(self.collector.build_rows(count))?;

        let probe_rows = self.collector.probe_rows(count);
        for &col in &self.probe.out_cols {
            let arr = self
                .probe_batch
                .column(col)
                .required("probe output column")?;
            arrays.push(arr.take(probe_rows)?);
        }

        trace!(rows = count, "hash join produced batch");

        output_batch(arrays, count)
    }

    fn drain_unmatched(&mut self) -> Result<Batch> {
        let drain = match &mut self.state {
            HashJoinState::Draining(drain) => drain,
            other => {
                return Err(DbError::new("Hash join not in draining state")
                    .with_field("state", format!("{other:?}")));
            }
        };
        let tracker = self
            .tracker
            .as_ref()
            .required("outer join tracker for build side")?;

        let count = drain.drain_next(tracker, self.batch_size, &mut self.drain_rows);
        if count == 0 {
            self.state = HashJoinState::Finished;
            return Ok(Batch::empty());
        }

        let mut arrays = self
            .table
            .take_output_columns(self.drain_rows.iter().map(|&row| Some(row)))?;
        arrays.extend(
            self.probe
                .out_cols
                .iter()
                .map(|&col| Array::new_typed_null_array(self.probe.source_types[col], count)),
        );

        trace!(rows = count, "hash join produced unmatched build rows");

        output_batch(arrays, count)
    }
}

impl BatchSource for PhysicalHashJoin {
    fn next_batch(&mut self) -> Result<Batch> {
        loop {
            match self.state {
                HashJoinState::Building => self.build_table()?,
                HashJoinState::Probing => {
                    if let Some(batch) = self.poll_probe()? {
                        return Ok(batch);
                    }
                }
                HashJoinState::Draining(_) => return self.drain_unmatched(),
                HashJoinState::Finished => return Ok(Batch::empty()),
            }
        }
    }
}

/// Compose an output batch, falling back to a column-less batch with only a
/// row count when there's nothing to project.
fn output_batch(arrays: Vec<Array>, num_rows: usize) -> Result<Batch> {
    if arrays.is_empty() {
        return Ok(Batch::empty_with_num_rows(num_rows));
    }
    Batch::try_from_arrays(arrays)
}
