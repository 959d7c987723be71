use colexec_error::{DbError, Result};

use super::array::Array;
use super::array::selection::Selection;
use super::datatype::DataType;

/// A batch of same-length arrays.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Arrays making up the batch.
    ///
    /// All arrays must have the same physical length.
    pub(crate) arrays: Vec<Array>,
    /// Number of physical rows in the batch.
    ///
    /// If the batch contains no arrays, number of rows can be arbitarily set.
    pub(crate) num_rows: usize,
    /// Optional ordered set of physical rows that are logically part of the
    /// batch.
    pub(crate) selection: Option<Vec<usize>>,
}

impl Batch {
    pub const fn empty() -> Self {
        Batch {
            arrays: Vec::new(),
            num_rows: 0,
            selection: None,
        }
    }

    /// Create a batch with no columns but a logical row count.
    pub fn empty_with_num_rows(num_rows: usize) -> Self {
        Batch {
            arrays: Vec::new(),
            num_rows,
            selection: None,
        }
    }

    /// Create a new batch from some number of arrays.
    ///
    /// All arrays must have the same length.
    pub fn try_from_arrays(arrays: impl IntoIterator<Item = Array>) -> Result<Self> {
        let arrays: Vec<_> = arrays.into_iter().collect();
        let num_rows = match arrays.first() {
            Some(arr) => arr.len(),
            None => return Ok(Batch::empty()),
        };

        for array in &arrays {
            if array.len() != num_rows {
                return Err(DbError::new(
                    "Attempted to create batch from arrays with different lengths",
                )
                .with_field("expected", num_rows)
                .with_field("got", array.len()));
            }
        }

        Ok(Batch {
            arrays,
            num_rows,
            selection: None,
        })
    }

    /// Attach a selection vector to this batch.
    ///
    /// Every index must point to a physical row in the batch.
    pub fn with_selection(mut self, selection: impl IntoIterator<Item = usize>) -> Result<Self> {
        let selection: Vec<_> = selection.into_iter().collect();
        if let Some(&idx) = selection.iter().find(|&&idx| idx >= self.num_rows) {
            return Err(DbError::new("Selection index out of bounds")
                .with_field("index", idx)
                .with_field("num_rows", self.num_rows));
        }
        self.selection = Some(selection);
        Ok(self)
    }

    /// Number of logical rows in the batch.
    pub fn num_rows(&self) -> usize {
        match &self.selection {
            Some(sel) => sel.len(),
            None => self.num_rows,
        }
    }

    /// Returns the logical-to-physical row mapping.
    pub fn selection(&self) -> Selection<'_> {
        match &self.selection {
            Some(sel) => Selection::slice(sel),
            None => Selection::linear(self.num_rows),
        }
    }

    pub fn has_selection(&self) -> bool {
        self.selection.is_some()
    }

    pub fn num_columns(&self) -> usize {
        self.arrays.len()
    }

    pub fn column(&self, idx: usize) -> Option<&Array> {
        self.arrays.get(idx)
    }

    pub fn arrays(&self) -> &[Array] {
        &self.arrays
    }

    pub fn into_arrays(self) -> Vec<Array> {
        self.arrays
    }

    /// Check that the columns in this batch match the expected types.
    pub fn check_types(&self, expected: &[DataType]) -> Result<()> {
        if self.arrays.is_empty() && self.num_rows() == 0 {
            // Terminal batches may omit columns.
            return Ok(());
        }

        if self.arrays.len() != expected.len() {
            return Err(DbError::new("Batch has unexpected number of columns")
                .with_field("expected", expected.len())
                .with_field("got", self.arrays.len()));
        }

        for (idx, (arr, want)) in self.arrays.iter().zip(expected).enumerate() {
            if arr.datatype() != *want {
                return Err(DbError::new("Column type mismatch")
                    .with_field("column", idx)
                    .with_field("expected", want)
                    .with_field("got", arr.datatype()));
            }
        }

        Ok(())
    }
}
