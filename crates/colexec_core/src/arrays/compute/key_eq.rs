//! Null-aware key comparison between build and probe rows.

use colexec_error::{DbError, Result};

use crate::arrays::array::Array;
use crate::arrays::array::physical_type::{
    Addressable,
    PhysicalBinary,
    PhysicalBool,
    PhysicalF32,
    PhysicalF64,
    PhysicalI16,
    PhysicalI32,
    PhysicalI64,
    PhysicalStorage,
    PhysicalType,
    PhysicalUtf8,
};

/// Candidate state for rows being verified against one key column.
#[derive(Debug)]
pub struct KeyCheckState<'a> {
    /// Physical row in the probe array for each logical probe row.
    pub probe_rows: &'a [usize],
    /// 1-based build row id of the current candidate per logical probe row. 0
    /// indicates no candidate.
    pub group_id: &'a mut [usize],
    /// Set to true when the current candidate doesn't match.
    pub differs: &'a mut [bool],
    /// Logical probe rows to check.
    pub to_check: &'a [usize],
}

/// Compare one key column of the candidate build rows against the probe rows.
///
/// For each row in `to_check` with a non-zero candidate:
///
/// - A null probe value can never match, the candidate is cleared.
/// - A null build value doesn't match this candidate, but later candidates in
///   the chain may still match.
/// - Otherwise the row differs if the values aren't equal.
///
/// `differs` is only ever set, never cleared.
pub fn check_key_column(build: &Array, probe: &Array, state: KeyCheckState) -> Result<()> {
    let build_type = build.datatype().physical_type();
    let probe_type = probe.datatype().physical_type();
    if build_type != probe_type {
        return Err(DbError::new("Key column types differ between build and probe")
            .with_field("build", build.datatype())
            .with_field("probe", probe.datatype()));
    }

    match build_type {
        PhysicalType::Boolean => check_key_column_inner::<PhysicalBool>(build, probe, state),
        PhysicalType::Int16 => check_key_column_inner::<PhysicalI16>(build, probe, state),
        PhysicalType::Int32 => check_key_column_inner::<PhysicalI32>(build, probe, state),
        PhysicalType::Int64 => check_key_column_inner::<PhysicalI64>(build, probe, state),
        PhysicalType::Float32 => check_key_column_inner::<PhysicalF32>(build, probe, state),
        PhysicalType::Float64 => check_key_column_inner::<PhysicalF64>(build, probe, state),
        PhysicalType::Utf8 => check_key_column_inner::<PhysicalUtf8>(build, probe, state),
        PhysicalType::Binary => check_key_column_inner::<PhysicalBinary>(build, probe, state),
    }
}

fn check_key_column_inner<S>(build: &Array, probe: &Array, state: KeyCheckState) -> Result<()>
where
    S: PhysicalStorage,
    S::StorageType: PartialEq,
{
    let build_vals = S::get_addressable(build.data())?;
    let probe_vals = S::get_addressable(probe.data())?;

    if !build.has_nulls() && !probe.has_nulls() {
        for &row in state.to_check {
            let id = state.group_id[row];
            if id == 0 {
                continue;
            }

            let build_val = value_at(&build_vals, id - 1, "build")?;
            let probe_val = value_at(&probe_vals, state.probe_rows[row], "probe")?;
            if build_val != probe_val {
                state.differs[row] = true;
            }
        }

        return Ok(());
    }

    for &row in state.to_check {
        let id = state.group_id[row];
        if id == 0 {
            continue;
        }

        let probe_idx = state.probe_rows[row];
        if !probe.is_valid(probe_idx) {
            state.group_id[row] = 0;
        } else if !build.is_valid(id - 1) {
            state.differs[row] = true;
        } else {
            let build_val = value_at(&build_vals, id - 1, "build")?;
            let probe_val = value_at(&probe_vals, probe_idx, "probe")?;
            if build_val != probe_val {
                state.differs[row] = true;
            }
        }
    }

    Ok(())
}

fn value_at<'a, A>(vals: &A, idx: usize, side: &str) -> Result<&'a A::T>
where
    A: Addressable<'a>,
{
    vals.get(idx).ok_or_else(|| {
        DbError::new("Key value out of bounds")
            .with_field("side", side)
            .with_field("index", idx)
    })
}
