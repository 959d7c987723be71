use colexec_error::{DbError, Result};

use super::physical_type::PhysicalType;

/// Typed value buffers backing an array.
///
/// Slots for null values hold the type's default value.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Boolean(Vec<bool>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    Utf8(Vec<String>),
    Binary(Vec<Vec<u8>>),
}

/// Apply an expression to the inner vec of every variant, producing a new
/// `ArrayData` of the same variant.
macro_rules! map_array_data {
    ($data:expr, $vals:ident => $body:expr) => {
        match $data {
            ArrayData::Boolean($vals) => ArrayData::Boolean($body),
            ArrayData::Int16($vals) => ArrayData::Int16($body),
            ArrayData::Int32($vals) => ArrayData::Int32($body),
            ArrayData::Int64($vals) => ArrayData::Int64($body),
            ArrayData::Float32($vals) => ArrayData::Float32($body),
            ArrayData::Float64($vals) => ArrayData::Float64($body),
            ArrayData::Utf8($vals) => ArrayData::Utf8($body),
            ArrayData::Binary($vals) => ArrayData::Binary($body),
        }
    };
}

impl ArrayData {
    pub fn new_empty(physical_type: PhysicalType) -> Self {
        Self::new_defaults(physical_type, 0)
    }

    /// Create data containing `len` default values.
    pub fn new_defaults(physical_type: PhysicalType, len: usize) -> Self {
        match physical_type {
            PhysicalType::Boolean => Self::Boolean(vec![false; len]),
            PhysicalType::Int16 => Self::Int16(vec![0; len]),
            PhysicalType::Int32 => Self::Int32(vec![0; len]),
            PhysicalType::Int64 => Self::Int64(vec![0; len]),
            PhysicalType::Float32 => Self::Float32(vec![0.0; len]),
            PhysicalType::Float64 => Self::Float64(vec![0.0; len]),
            PhysicalType::Utf8 => Self::Utf8(vec![String::new(); len]),
            PhysicalType::Binary => Self::Binary(vec![Vec::new(); len]),
        }
    }

    pub const fn physical_type(&self) -> PhysicalType {
        match self {
            Self::Boolean(_) => PhysicalType::Boolean,
            Self::Int16(_) => PhysicalType::Int16,
            Self::Int32(_) => PhysicalType::Int32,
            Self::Int64(_) => PhysicalType::Int64,
            Self::Float32(_) => PhysicalType::Float32,
            Self::Float64(_) => PhysicalType::Float64,
            Self::Utf8(_) => PhysicalType::Utf8,
            Self::Binary(_) => PhysicalType::Binary,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Boolean(v) => v.len(),
            Self::Int16(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Float64(v) => v.len(),
            Self::Utf8(v) => v.len(),
            Self::Binary(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Gather values into new data.
    ///
    /// `None` entries produce a default value. Errors if an index is out of
    /// bounds.
    pub fn select_optional(
        &self,
        indices: impl ExactSizeIterator<Item = Option<usize>> + Clone,
    ) -> Result<ArrayData> {
        let len = self.len();
        if let Some(idx) = indices.clone().flatten().find(|&idx| idx >= len) {
            return Err(DbError::new("Selection index out of bounds")
                .with_field("index", idx)
                .with_field("len", len));
        }

        Ok(map_array_data!(self, vals => indices
            .map(|idx| idx.and_then(|idx| vals.get(idx)).cloned().unwrap_or_default())
            .collect()))
    }

    /// Append values at `indices` in `other` to the end of self.
    ///
    /// Both must be the same physical type.
    pub fn append_selected(
        &mut self,
        other: &ArrayData,
        indices: impl Iterator<Item = usize> + Clone,
    ) -> Result<()> {
        let other_len = other.len();
        if let Some(idx) = indices.clone().find(|&idx| idx >= other_len) {
            return Err(DbError::new("Append index out of bounds")
                .with_field("index", idx)
                .with_field("len", other_len));
        }

        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a.extend(indices.map(|idx| b[idx])),
            (Self::Int16(a), Self::Int16(b)) => a.extend(indices.map(|idx| b[idx])),
            (Self::Int32(a), Self::Int32(b)) => a.extend(indices.map(|idx| b[idx])),
            (Self::Int64(a), Self::Int64(b)) => a.extend(indices.map(|idx| b[idx])),
            (Self::Float32(a), Self::Float32(b)) => a.extend(indices.map(|idx| b[idx])),
            (Self::Float64(a), Self::Float64(b)) => a.extend(indices.map(|idx| b[idx])),
            (Self::Utf8(a), Self::Utf8(b)) => a.extend(indices.map(|idx| b[idx].clone())),
            (Self::Binary(a), Self::Binary(b)) => a.extend(indices.map(|idx| b[idx].clone())),
            (a, b) => {
                return Err(DbError::new("Cannot append array data of different types")
                    .with_field("self", a.physical_type())
                    .with_field("other", b.physical_type()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_optional_defaults() {
        let data = ArrayData::Utf8(vec!["a".to_string(), "b".to_string()]);
        let out = data
            .select_optional([Some(1), None, Some(0)].into_iter())
            .unwrap();
        assert_eq!(
            ArrayData::Utf8(vec!["b".to_string(), String::new(), "a".to_string()]),
            out
        );
    }

    #[test]
    fn select_out_of_bounds() {
        let data = ArrayData::Int32(vec![1]);
        data.select_optional([Some(1)].into_iter()).unwrap_err();
    }

    #[test]
    fn append_mismatched_types() {
        let mut a = ArrayData::Int32(vec![1]);
        let b = ArrayData::Int64(vec![2]);
        a.append_selected(&b, 0..1).unwrap_err();
    }

    #[test]
    fn append_selected_rows() {
        let mut a = ArrayData::Int64(vec![1]);
        let b = ArrayData::Int64(vec![2, 3, 4]);
        a.append_selected(&b, [2, 0].into_iter()).unwrap();
        assert_eq!(ArrayData::Int64(vec![1, 4, 2]), a);
    }
}
