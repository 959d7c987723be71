use colexec_error::{DbError, OptionExt, Result};

use super::probe::resolve_candidates;
use crate::arrays::array::Array;
use crate::arrays::batch::Batch;
use crate::arrays::compute::hash::rehash_array;
use crate::arrays::datatype::DataType;

/// Hash table holding every row from the build side of a join.
///
/// Rows are assigned 1-based ids in insertion order. Id 0 is reserved to mean
/// "no row", which lets both `head` and `same` use plain `usize` links.
///
/// Row `id` lives at physical index `id - 1` in each of the materialized
/// columns.
#[derive(Debug)]
pub struct JoinHashTable {
    /// Materialized build columns. Holds every equality and output column
    /// exactly once.
    pub(crate) vals: Vec<Array>,
    /// Position in `vals` for each equality column, in join key order.
    pub(crate) key_cols: Vec<usize>,
    /// Position in `vals` for each build output column.
    pub(crate) out_cols: Vec<usize>,
    /// Source column index for each entry in `vals`.
    source_cols: Vec<usize>,
    /// Number of buckets.
    pub(crate) bucket_count: usize,
    /// Most recently inserted row id per bucket, 0 if the bucket is empty.
    pub(crate) head: Vec<usize>,
    /// Row id inserted into the same bucket before this one, indexed by row id.
    pub(crate) same: Vec<usize>,
    /// Row id inserted before this one with an identical, non-null key, indexed
    /// by row id.
    ///
    /// Empty for distinct tables.
    dups: Vec<usize>,
    /// If every build key is assumed unique.
    distinct: bool,
    num_rows: usize,
    /// Reusable hash buffer.
    hashes: Vec<u64>,
}

impl JoinHashTable {
    /// Create a new empty hash table for a build side producing batches of
    /// `source_types`.
    pub fn try_new(
        source_types: &[DataType],
        eq_cols: &[usize],
        out_cols: &[usize],
        bucket_count: usize,
        distinct: bool,
    ) -> Result<Self> {
        if bucket_count == 0 {
            return Err(DbError::new("Hash table bucket count must be greater than zero"));
        }

        let mut source_cols: Vec<usize> = Vec::with_capacity(eq_cols.len() + out_cols.len());
        let mut position_for = |col: usize| -> Result<usize> {
            if col >= source_types.len() {
                return Err(DbError::new("Build column index out of range")
                    .with_fields([("column", col), ("num_columns", source_types.len())]));
            }
            match source_cols.iter().position(|&c| c == col) {
                Some(pos) => Ok(pos),
                None => {
                    source_cols.push(col);
                    Ok(source_cols.len() - 1)
                }
            }
        };

        let key_cols = eq_cols
            .iter()
            .map(|&col| position_for(col))
            .collect::<Result<Vec<_>>>()?;
        let out_positions = out_cols
            .iter()
            .map(|&col| position_for(col))
            .collect::<Result<Vec<_>>>()?;

        let vals = source_cols
            .iter()
            .map(|&col| Array::new_empty(source_types[col]))
            .collect();

        Ok(JoinHashTable {
            vals,
            key_cols,
            out_cols: out_positions,
            source_cols,
            bucket_count,
            head: vec![0; bucket_count],
            same: vec![0],
            dups: if distinct { Vec::new() } else { vec![0] },
            distinct,
            num_rows: 0,
            hashes: Vec::new(),
        })
    }

    /// Number of rows inserted into the table.
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Data types of the build output columns.
    pub fn output_types(&self) -> impl ExactSizeIterator<Item = DataType> + '_ {
        self.out_cols.iter().map(|&pos| self.vals[pos].datatype())
    }

    #[inline]
    pub(crate) fn bucket_for_hash(&self, hash: u64) -> usize {
        (hash % self.bucket_count as u64) as usize
    }

    /// Next row id with an identical key to `id`, or 0 if there are none left.
    #[inline]
    pub(crate) fn next_duplicate(&self, id: usize) -> usize {
        self.dups.get(id).copied().unwrap_or(0)
    }

    /// Insert all logical rows from a build batch.
    ///
    /// Rows are materialized in selection order, hashed on the equality
    /// columns, and pushed onto the front of their bucket chains.
    pub fn insert_batch(&mut self, batch: &Batch) -> Result<()> {
        let num_rows = batch.num_rows();
        if num_rows == 0 {
            return Ok(());
        }

        let selection = batch.selection();

        for (pos, &col) in self.source_cols.iter().enumerate() {
            let arr = batch.column(col).required("build column")?;
            self.vals[pos].append_selected(arr, selection.iter())?;
        }

        self.hashes.clear();
        self.hashes.resize(num_rows, 0);
        for &pos in &self.key_cols {
            let col = self.source_cols[pos];
            let arr = batch.column(col).required("build key column")?;
            rehash_array(arr, selection, &mut self.hashes)?;
        }

        let start_id = self.num_rows + 1;
        self.same.resize(start_id + num_rows, 0);
        for (offset, &hash) in self.hashes.iter().enumerate() {
            let id = start_id + offset;
            let bucket = self.bucket_for_hash(hash);
            self.same[id] = self.head[bucket];
            self.head[bucket] = id;
        }
        self.num_rows += num_rows;

        if !self.distinct {
            self.link_duplicates(start_id, num_rows)?;
        }

        Ok(())
    }

    /// Compute the equal-key links for newly inserted rows by probing each new
    /// row against the rows before it in its bucket chain.
    fn link_duplicates(&mut self, start_id: usize, count: usize) -> Result<()> {
        let probe_rows: Vec<usize> = (start_id - 1..start_id - 1 + count).collect();
        let mut group_id: Vec<usize> = self.same[start_id..start_id + count].to_vec();
        let mut differs = vec![false; count];
        let mut to_check: Vec<usize> = (0..count).filter(|&row| group_id[row] != 0).collect();

        {
            let probe_keys: Vec<&Array> =
                self.key_cols.iter().map(|&pos| &self.vals[pos]).collect();
            resolve_candidates(
                self,
                &probe_keys,
                &probe_rows,
                &mut group_id,
                &mut differs,
                &mut to_check,
            )?;
        }

        self.dups.resize(start_id + count, 0);
        self.dups[start_id..start_id + count].copy_from_slice(&group_id);

        Ok(())
    }

    /// Gather build output columns for the given physical build rows, `None`
    /// producing a null.
    pub(crate) fn take_output_columns(
        &self,
        rows: impl ExactSizeIterator<Item = Option<usize>> + Clone,
    ) -> Result<Vec<Array>> {
        self.out_cols
            .iter()
            .map(|&pos| self.vals[pos].take_optional(rows.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generate_batch;

    #[test]
    fn chains_are_most_recent_first() {
        // Single bucket, every row collides.
        let mut table = JoinHashTable::try_new(&[DataType::Int64], &[0], &[0], 1, false).unwrap();
        table
            .insert_batch(&generate_batch!([4i64, 5, 6]))
            .unwrap();

        assert_eq!(3, table.num_rows());
        assert_eq!(vec![3], table.head);
        assert_eq!(vec![0, 0, 1, 2], table.same);
    }

    #[test]
    fn duplicates_skip_colliding_rows() {
        let mut table = JoinHashTable::try_new(&[DataType::Int64], &[0], &[], 1, false).unwrap();
        table
            .insert_batch(&generate_batch!([7i64, 8, 7]))
            .unwrap();
        table.insert_batch(&generate_batch!([7i64])).unwrap();

        assert_eq!(0, table.next_duplicate(1));
        assert_eq!(0, table.next_duplicate(2));
        assert_eq!(1, table.next_duplicate(3));
        assert_eq!(3, table.next_duplicate(4));
    }

    #[test]
    fn null_keys_never_linked() {
        let mut table = JoinHashTable::try_new(&[DataType::Int32], &[0], &[], 4, false).unwrap();
        table
            .insert_batch(&generate_batch!([None, None, Some(2i32)]))
            .unwrap();

        assert_eq!(0, table.next_duplicate(1));
        assert_eq!(0, table.next_duplicate(2));
        assert_eq!(0, table.next_duplicate(3));
    }

    #[test]
    fn distinct_table_has_no_duplicates() {
        let mut table = JoinHashTable::try_new(&[DataType::Int64], &[0], &[], 2, true).unwrap();
        table.insert_batch(&generate_batch!([1i64, 1])).unwrap();
        assert_eq!(0, table.next_duplicate(2));
    }

    #[test]
    fn insert_respects_selection() {
        let mut table = JoinHashTable::try_new(
            &[DataType::Int64, DataType::Utf8],
            &[0],
            &[1, 0],
            8,
            false,
        )
        .unwrap();
        let batch = generate_batch!([1i64, 2, 3], ["a", "b", "c"])
            .with_selection([2, 0])
            .unwrap();
        table.insert_batch(&batch).unwrap();

        assert_eq!(2, table.num_rows());
        assert_eq!(2, table.vals.len());
        assert_eq!(&Array::from_iter([3i64, 1]), &table.vals[0]);
        assert_eq!(&Array::from_iter(["c", "a"]), &table.vals[1]);
        assert_eq!(vec![1, 0], table.out_cols);
    }

    #[test]
    fn empty_batch_is_noop() {
        let mut table = JoinHashTable::try_new(&[DataType::Int64], &[0], &[0], 8, false).unwrap();
        table.insert_batch(&Batch::empty()).unwrap();
        assert_eq!(0, table.num_rows());
        assert!(table.head.iter().all(|&id| id == 0));
    }

    #[test]
    fn zero_buckets_rejected() {
        JoinHashTable::try_new(&[DataType::Int64], &[0], &[], 0, false).unwrap_err();
    }

    #[test]
    fn column_out_of_range_rejected() {
        let err = JoinHashTable::try_new(&[DataType::Int64], &[1], &[], 8, false).unwrap_err();
        assert_eq!(Some("1"), err.get_field("column"));
        assert_eq!(Some("1"), err.get_field("num_columns"));
    }

    #[test]
    fn build_and_probe_share_bucket_function() {
        let mut table = JoinHashTable::try_new(&[DataType::Utf8], &[0], &[], 7, false).unwrap();
        table.insert_batch(&generate_batch!(["a", "b"])).unwrap();

        let mut hashes = vec![0; 2];
        rehash_array(
            &Array::from_iter(["a", "b"]),
            crate::arrays::array::selection::Selection::linear(2),
            &mut hashes,
        )
        .unwrap();

        assert_eq!(2, table.head[table.bucket_for_hash(hashes[1])]);
        let a_bucket = table.bucket_for_hash(hashes[0]);
        assert!(table.head[a_bucket] == 1 || table.same[table.head[a_bucket]] == 1);
    }
}
