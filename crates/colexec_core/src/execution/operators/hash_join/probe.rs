use colexec_error::{OptionExt, Result};
use tracing::trace;

use super::hash_table::JoinHashTable;
use crate::arrays::array::Array;
use crate::arrays::batch::Batch;
use crate::arrays::compute::hash::rehash_array;
use crate::arrays::compute::key_eq::{KeyCheckState, check_key_column};

/// Resolves the first matching build row for each row of a probe batch.
///
/// After `probe`, `group_id[i]` holds the 1-based id of the most recently
/// inserted build row whose key equals logical probe row `i`, or 0 if there is
/// none.
#[derive(Debug, Default)]
pub struct HashJoinProber {
    /// Physical row in the probe batch for each logical row.
    pub(crate) probe_rows: Vec<usize>,
    /// Row hashes for the current probe batch.
    hashes: Vec<u64>,
    /// Matched build row id per logical row.
    pub(crate) group_id: Vec<usize>,
    differs: Vec<bool>,
    to_check: Vec<usize>,
}

impl HashJoinProber {
    /// Number of logical rows in the last probed batch.
    pub fn num_rows(&self) -> usize {
        self.group_id.len()
    }

    pub fn group_ids(&self) -> &[usize] {
        &self.group_id
    }

    /// Find the matching build row for every logical row in `batch`.
    pub fn probe(&mut self, table: &JoinHashTable, batch: &Batch, eq_cols: &[usize]) -> Result<()> {
        let num_rows = batch.num_rows();
        let selection = batch.selection();

        self.probe_rows.clear();
        self.probe_rows.extend(selection.iter());

        let probe_keys = eq_cols
            .iter()
            .map(|&col| batch.column(col).required("probe key column"))
            .collect::<Result<Vec<_>>>()?;

        self.hashes.clear();
        self.hashes.resize(num_rows, 0);
        for key in &probe_keys {
            rehash_array(key, selection, &mut self.hashes)?;
        }

        self.group_id.clear();
        self.group_id.extend(
            self.hashes
                .iter()
                .map(|&hash| table.head[table.bucket_for_hash(hash)]),
        );

        self.differs.clear();
        self.differs.resize(num_rows, false);

        self.to_check.clear();
        self.to_check
            .extend((0..num_rows).filter(|&row| self.group_id[row] != 0));

        trace!(rows = num_rows, candidates = self.to_check.len(), "probing hash table");

        resolve_candidates(
            table,
            &probe_keys,
            &self.probe_rows,
            &mut self.group_id,
            &mut self.differs,
            &mut self.to_check,
        )
    }
}

/// Walk bucket chains until every row in `to_check` either points at a build
/// row with an equal key, or at 0.
///
/// `probe_keys` are compared column-wise against the table's equality columns,
/// with `probe_rows` mapping each logical row to a physical index into the
/// probe arrays. `to_check` is drained.
pub(crate) fn resolve_candidates(
    table: &JoinHashTable,
    probe_keys: &[&Array],
    probe_rows: &[usize],
    group_id: &mut [usize],
    differs: &mut [bool],
    to_check: &mut Vec<usize>,
) -> Result<()> {
    while !to_check.is_empty() {
        for &row in to_check.iter() {
            differs[row] = false;
        }

        for (probe_key, &pos) in probe_keys.iter().zip(&table.key_cols) {
            check_key_column(
                &table.vals[pos],
                probe_key,
                KeyCheckState {
                    probe_rows,
                    group_id: &mut *group_id,
                    differs: &mut *differs,
                    to_check: to_check.as_slice(),
                },
            )?;
        }

        to_check.retain(|&row| {
            let id = group_id[row];
            if id == 0 || !differs[row] {
                return false;
            }
            group_id[row] = table.same[id];
            group_id[row] != 0
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::generate_batch;

    fn build_table(
        batch: &Batch,
        types: &[DataType],
        eq_cols: &[usize],
        buckets: usize,
    ) -> JoinHashTable {
        let mut table = JoinHashTable::try_new(types, eq_cols, &[], buckets, false).unwrap();
        table.insert_batch(batch).unwrap();
        table
    }

    #[test]
    fn finds_most_recent_match() {
        let table = build_table(&generate_batch!([1i64, 2, 1]), &[DataType::Int64], &[0], 16);

        let mut prober = HashJoinProber::default();
        prober
            .probe(&table, &generate_batch!([1i64, 3, 2]), &[0])
            .unwrap();

        assert_eq!(&[3, 0, 2], prober.group_ids());
    }

    #[test]
    fn resolves_through_collisions() {
        // Ints hash to themselves, 8 buckets puts 0, 8, 16 in the same bucket.
        let table = build_table(&generate_batch!([0i64, 8, 16]), &[DataType::Int64], &[0], 8);
        assert_eq!(3, table.head[0]);

        let mut prober = HashJoinProber::default();
        prober
            .probe(&table, &generate_batch!([8i64, 0, 24]), &[0])
            .unwrap();

        assert_eq!(&[2, 1, 0], prober.group_ids());
    }

    #[test]
    fn null_probe_never_matches() {
        let table = build_table(
            &generate_batch!([None, Some(1i32)]),
            &[DataType::Int32],
            &[0],
            1,
        );

        let mut prober = HashJoinProber::default();
        prober
            .probe(&table, &generate_batch!([None, Some(1i32)]), &[0])
            .unwrap();

        assert_eq!(&[0, 2], prober.group_ids());
    }

    #[test]
    fn null_build_skipped_for_later_match() {
        // Null build row sits at the front of the chain and must be skipped.
        let table = build_table(
            &generate_batch!([Some(0i32), None]),
            &[DataType::Int32],
            &[0],
            1,
        );
        assert_eq!(2, table.head[0]);

        let mut prober = HashJoinProber::default();
        prober
            .probe(&table, &generate_batch!([0i32]), &[0])
            .unwrap();

        assert_eq!(&[1], prober.group_ids());
    }

    #[test]
    fn multi_column_keys() {
        let table = build_table(
            &generate_batch!([1i64, 1, 2], ["a", "b", "a"]),
            &[DataType::Int64, DataType::Utf8],
            &[0, 1],
            4,
        );

        let mut prober = HashJoinProber::default();
        prober
            .probe(
                &table,
                &generate_batch!(["b", "a", "a"], [1i64, 2, 3]),
                &[1, 0],
            )
            .unwrap();

        assert_eq!(&[2, 3, 0], prober.group_ids());
    }

    #[test]
    fn probe_with_selection() {
        let table = build_table(&generate_batch!([5i64, 6]), &[DataType::Int64], &[0], 4);

        let batch = generate_batch!([6i64, 7, 5]).with_selection([2, 1]).unwrap();
        let mut prober = HashJoinProber::default();
        prober.probe(&table, &batch, &[0]).unwrap();

        assert_eq!(&[1, 0], prober.group_ids());
        assert_eq!(vec![2, 1], prober.probe_rows);
    }

    #[test]
    fn probe_type_mismatch() {
        let table = build_table(&generate_batch!([5i64]), &[DataType::Int64], &[0], 1);

        let mut prober = HashJoinProber::default();
        prober
            .probe(&table, &generate_batch!(["5"]), &[0])
            .unwrap_err();
    }
}
