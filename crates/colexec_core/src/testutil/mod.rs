//! Test utilities.
//!
//! Note this this isn't behind a `#[cfg(test)]` flag since this should be
//! usable from integration tests and benchmarks.
//!
//! Should not be used outside of tests.

use colexec_error::{DbError, Result};

use crate::arrays::array::Array;
use crate::arrays::batch::Batch;
use crate::arrays::datatype::DataType;
use crate::arrays::scalar::ScalarValue;
use crate::execution::operators::BatchSource;

/// Create a batch from some number of iterators of native values, one per
/// column.
///
/// Panics if the columns have different lengths.
#[macro_export]
macro_rules! generate_batch {
    ($($col:expr),* $(,)?) => {
        $crate::arrays::batch::Batch::try_from_arrays(vec![
            $($crate::arrays::array::Array::from_iter($col),)*
        ])
        .unwrap()
    };
}

/// Asserts that two arrays are logically equal.
pub fn assert_arrays_eq(a: &Array, b: &Array) {
    assert_eq!(a.datatype(), b.datatype(), "data types differ");
    assert_eq!(a.len(), b.len(), "lengths differ");

    for row_idx in 0..a.len() {
        let a_val = a.logical_value(row_idx).unwrap();
        let b_val = b.logical_value(row_idx).unwrap();

        assert_eq!(a_val, b_val, "values differ at row {row_idx}");
    }
}

/// Asserts that two batches are logically equal, taking selections into
/// account.
pub fn assert_batches_eq(a: &Batch, b: &Batch) {
    assert_eq!(a.num_rows(), b.num_rows(), "num rows differ");
    assert_eq!(a.num_columns(), b.num_columns(), "num columns differ");

    for col_idx in 0..a.num_columns() {
        let a_col = a.column(col_idx).unwrap();
        let b_col = b.column(col_idx).unwrap();
        assert_eq!(a_col.datatype(), b_col.datatype(), "data types differ");
    }

    assert_eq!(batch_rows(a).unwrap(), batch_rows(b).unwrap());
}

/// Get the logical rows of a batch as scalars.
pub fn batch_rows(batch: &Batch) -> Result<Vec<Vec<ScalarValue>>> {
    batch
        .selection()
        .iter()
        .map(|row_idx| {
            batch
                .arrays()
                .iter()
                .map(|arr| arr.logical_value(row_idx))
                .collect::<Result<Vec<_>>>()
        })
        .collect()
}

/// Pull from a source until it's exhausted, returning every row produced.
pub fn collect_all_rows(source: &mut dyn BatchSource) -> Result<Vec<Vec<ScalarValue>>> {
    let mut rows = Vec::new();
    loop {
        let batch = source.next_batch()?;
        if batch.num_rows() == 0 {
            return Ok(rows);
        }
        rows.extend(batch_rows(&batch)?);
    }
}

/// Split scalar rows into batches of at most `batch_size` rows.
pub fn batches_from_rows(
    types: &[DataType],
    rows: &[Vec<ScalarValue>],
    batch_size: usize,
) -> Result<Vec<Batch>> {
    if batch_size == 0 {
        return Err(DbError::new("Batch size must be greater than zero"));
    }

    rows.chunks(batch_size)
        .map(|chunk| {
            let arrays = types
                .iter()
                .enumerate()
                .map(|(col_idx, &datatype)| {
                    Array::try_from_scalars(datatype, chunk.iter().map(|row| &row[col_idx]))
                })
                .collect::<Result<Vec<_>>>()?;
            Batch::try_from_arrays(arrays)
        })
        .collect()
}

/// One input to `naive_hash_join`.
#[derive(Debug, Clone, Copy)]
pub struct NaiveJoinInput<'a> {
    pub rows: &'a [Vec<ScalarValue>],
    pub eq_cols: &'a [usize],
    pub out_cols: &'a [usize],
}

/// Nested-loop equality join used as a reference for the hash join.
///
/// Nulls never compare equal to anything. Output follows the same order the
/// hash join produces: probe order, with duplicate build matches most recently
/// inserted first, followed by unmatched build rows in insertion order.
pub fn naive_hash_join(
    build: NaiveJoinInput,
    probe: NaiveJoinInput,
    outer: bool,
    build_outer: bool,
) -> Vec<Vec<ScalarValue>> {
    fn project(row: &[ScalarValue], cols: &[usize]) -> Vec<ScalarValue> {
        cols.iter().map(|&col| row[col].clone()).collect()
    }

    fn nulls(n: usize) -> Vec<ScalarValue> {
        vec![ScalarValue::Null; n]
    }

    let mut visited = vec![false; build.rows.len()];
    let mut output = Vec::new();

    for probe_row in probe.rows {
        let mut matched = false;

        for (build_idx, build_row) in build.rows.iter().enumerate().rev() {
            let keys_eq = build.eq_cols.iter().zip(probe.eq_cols).all(|(&b, &p)| {
                let (build_val, probe_val) = (&build_row[b], &probe_row[p]);
                !build_val.is_null() && !probe_val.is_null() && build_val == probe_val
            });

            if keys_eq {
                matched = true;
                visited[build_idx] = true;
                let mut out = project(build_row, build.out_cols);
                out.extend(project(probe_row, probe.out_cols));
                output.push(out);
            }
        }

        if !matched && outer {
            let mut out = nulls(build.out_cols.len());
            out.extend(project(probe_row, probe.out_cols));
            output.push(out);
        }
    }

    if build_outer {
        for (build_row, visited) in build.rows.iter().zip(visited) {
            if !visited {
                let mut out = project(build_row, build.out_cols);
                out.extend(nulls(probe.out_cols.len()));
                output.push(out);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrays_eq() {
        let a = Array::from_iter([1i32, 2, 3]);
        let b = Array::from_iter([Some(1i32), Some(2), Some(3)]);

        assert_arrays_eq(&a, &b);
    }

    #[test]
    #[should_panic]
    fn arrays_not_eq() {
        let a = Array::from_iter([1i32, 2, 3]);
        let b = Array::from_iter(["a", "b", "c"]);

        assert_arrays_eq(&a, &b);
    }

    #[test]
    fn batches_eq_with_selection() {
        let a = generate_batch!([3i64, 1]);
        let b = generate_batch!([1i64, 2, 3]).with_selection([2, 0]).unwrap();

        assert_batches_eq(&a, &b);
    }

    #[test]
    fn rows_roundtrip_through_batches() {
        let rows = vec![
            vec![ScalarValue::Int64(1), ScalarValue::from("a")],
            vec![ScalarValue::Null, ScalarValue::from("b")],
            vec![ScalarValue::Int64(3), ScalarValue::Null],
        ];
        let batches = batches_from_rows(&[DataType::Int64, DataType::Utf8], &rows, 2).unwrap();

        assert_eq!(2, batches.len());
        let got: Vec<_> = batches
            .iter()
            .flat_map(|b| batch_rows(b).unwrap())
            .collect();
        assert_eq!(rows, got);
    }

    #[test]
    fn naive_join_null_keys_never_match() {
        let build = vec![vec![ScalarValue::Null], vec![ScalarValue::Int64(1)]];
        let probe = vec![vec![ScalarValue::Null], vec![ScalarValue::Int64(1)]];

        let out = naive_hash_join(
            NaiveJoinInput {
                rows: &build,
                eq_cols: &[0],
                out_cols: &[0],
            },
            NaiveJoinInput {
                rows: &probe,
                eq_cols: &[0],
                out_cols: &[0],
            },
            true,
            true,
        );

        assert_eq!(
            vec![
                vec![ScalarValue::Null, ScalarValue::Null],
                vec![ScalarValue::Int64(1), ScalarValue::Int64(1)],
                vec![ScalarValue::Null, ScalarValue::Null],
            ],
            out
        );
    }
}
