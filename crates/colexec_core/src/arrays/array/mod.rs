pub mod array_data;
pub mod physical_type;
pub mod selection;
pub mod validity;

use array_data::ArrayData;
use colexec_error::{DbError, Result};
use validity::Validity;

use super::bitmap::Bitmap;
use super::datatype::DataType;
use super::scalar::ScalarValue;

/// A typed column of values with a validity mask.
#[derive(Debug, Clone, PartialEq)]
pub struct Array {
    pub(crate) datatype: DataType,
    pub(crate) data: ArrayData,
    pub(crate) validity: Validity,
}

impl Array {
    /// Create a new array from existing data.
    ///
    /// Errors if the data's physical type doesn't match the datatype, or if
    /// the validity length differs from the data length.
    pub fn try_new(datatype: DataType, data: ArrayData, validity: Validity) -> Result<Self> {
        if datatype.physical_type() != data.physical_type() {
            return Err(DbError::new("Array data does not match datatype")
                .with_field("datatype", datatype)
                .with_field("physical_type", data.physical_type()));
        }
        if data.len() != validity.len() {
            return Err(DbError::new("Validity length does not match data length")
                .with_field("data_len", data.len())
                .with_field("validity_len", validity.len()));
        }

        Ok(Array {
            datatype,
            data,
            validity,
        })
    }

    /// Create a zero-length array that can be appended to.
    pub fn new_empty(datatype: DataType) -> Self {
        Array {
            datatype,
            data: ArrayData::new_empty(datatype.physical_type()),
            validity: Validity::new_all_valid(0),
        }
    }

    /// Create an array of the given type where every value is null.
    pub fn new_typed_null_array(datatype: DataType, len: usize) -> Self {
        Array {
            datatype,
            data: ArrayData::new_defaults(datatype.physical_type(), len),
            validity: Validity::new_all_invalid(len),
        }
    }

    pub fn datatype(&self) -> DataType {
        self.datatype
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn validity(&self) -> &Validity {
        &self.validity
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_nulls(&self) -> bool {
        !self.validity.all_valid()
    }

    pub fn is_valid(&self, idx: usize) -> bool {
        self.validity.is_valid(idx)
    }

    /// Append the rows at `indices` from `other` to this array.
    pub fn append_selected(
        &mut self,
        other: &Array,
        indices: impl Iterator<Item = usize> + Clone,
    ) -> Result<()> {
        if self.datatype != other.datatype {
            return Err(DbError::new("Cannot append arrays with different datatypes")
                .with_field("self", self.datatype)
                .with_field("other", other.datatype));
        }

        self.data.append_selected(&other.data, indices.clone())?;
        self.validity.append_selected(&other.validity, indices);

        Ok(())
    }

    /// Create a new array containing the rows at `indices`.
    pub fn take(&self, indices: &[usize]) -> Result<Array> {
        self.take_optional(indices.iter().map(|&idx| Some(idx)))
    }

    /// Create a new array by gathering rows, producing null for `None`.
    pub fn take_optional(
        &self,
        indices: impl ExactSizeIterator<Item = Option<usize>> + Clone,
    ) -> Result<Array> {
        let data = self.data.select_optional(indices.clone())?;
        let validity = self.validity.select_optional(indices);

        Ok(Array {
            datatype: self.datatype,
            data,
            validity,
        })
    }

    /// Get the logical value at the given index.
    pub fn logical_value(&self, idx: usize) -> Result<ScalarValue> {
        if idx >= self.len() {
            return Err(DbError::new("Index out of bounds")
                .with_field("index", idx)
                .with_field("len", self.len()));
        }
        if !self.validity.is_valid(idx) {
            return Ok(ScalarValue::Null);
        }

        Ok(match (&self.datatype, &self.data) {
            (DataType::Date32, ArrayData::Int32(v)) => ScalarValue::Date32(v[idx]),
            (_, ArrayData::Boolean(v)) => ScalarValue::Boolean(v[idx]),
            (_, ArrayData::Int16(v)) => ScalarValue::Int16(v[idx]),
            (_, ArrayData::Int32(v)) => ScalarValue::Int32(v[idx]),
            (_, ArrayData::Int64(v)) => ScalarValue::Int64(v[idx]),
            (_, ArrayData::Float32(v)) => ScalarValue::Float32(v[idx]),
            (_, ArrayData::Float64(v)) => ScalarValue::Float64(v[idx]),
            (_, ArrayData::Utf8(v)) => ScalarValue::Utf8(v[idx].clone()),
            (_, ArrayData::Binary(v)) => ScalarValue::Binary(v[idx].clone()),
        })
    }

    /// Build an array of `datatype` from scalar values.
    ///
    /// `ScalarValue::Null` is accepted for every datatype.
    pub fn try_from_scalars<'a>(
        datatype: DataType,
        scalars: impl IntoIterator<Item = &'a ScalarValue>,
    ) -> Result<Array> {
        let scalars: Vec<_> = scalars.into_iter().collect();

        let arr = match datatype {
            DataType::Boolean => Array::from_iter(collect_scalars(datatype, &scalars, |s| {
                match s {
                    ScalarValue::Boolean(v) => Some(*v),
                    _ => None,
                }
            })?),
            DataType::Int16 => Array::from_iter(collect_scalars(datatype, &scalars, |s| match s {
                ScalarValue::Int16(v) => Some(*v),
                _ => None,
            })?),
            DataType::Int32 => Array::from_iter(collect_scalars(datatype, &scalars, |s| match s {
                ScalarValue::Int32(v) => Some(*v),
                _ => None,
            })?),
            DataType::Date32 => {
                let arr = Array::from_iter(collect_scalars(datatype, &scalars, |s| match s {
                    ScalarValue::Date32(v) => Some(*v),
                    _ => None,
                })?);
                Array {
                    datatype: DataType::Date32,
                    ..arr
                }
            }
            DataType::Int64 => Array::from_iter(collect_scalars(datatype, &scalars, |s| match s {
                ScalarValue::Int64(v) => Some(*v),
                _ => None,
            })?),
            DataType::Float32 => {
                Array::from_iter(collect_scalars(datatype, &scalars, |s| match s {
                    ScalarValue::Float32(v) => Some(*v),
                    _ => None,
                })?)
            }
            DataType::Float64 => {
                Array::from_iter(collect_scalars(datatype, &scalars, |s| match s {
                    ScalarValue::Float64(v) => Some(*v),
                    _ => None,
                })?)
            }
            DataType::Utf8 => Array::from_iter(collect_scalars(datatype, &scalars, |s| match s {
                ScalarValue::Utf8(v) => Some(v.clone()),
                _ => None,
            })?),
            DataType::Binary => {
                let values = collect_scalars(datatype, &scalars, |s| match s {
                    ScalarValue::Binary(v) => Some(v.as_slice()),
                    _ => None,
                })?;
                Array::from_iter(values)
            }
        };

        Ok(arr)
    }
}

fn collect_scalars<'a, T>(
    datatype: DataType,
    scalars: &[&'a ScalarValue],
    extract: impl Fn(&'a ScalarValue) -> Option<T>,
) -> Result<Vec<Option<T>>> {
    scalars
        .iter()
        .map(|&scalar| {
            if scalar.is_null() {
                return Ok(None);
            }
            match extract(scalar) {
                Some(v) => Ok(Some(v)),
                None => Err(DbError::new("Scalar does not match datatype")
                    .with_field("datatype", datatype)
                    .with_field("scalar", scalar)),
            }
        })
        .collect()
}

macro_rules! impl_from_iter {
    ([$($gen:tt)*] $native:ty, $datatype:ident, $variant:ident, $conv:expr) => {
        impl<$($gen)*> FromIterator<$native> for Array {
            fn from_iter<T: IntoIterator<Item = $native>>(iter: T) -> Self {
                let values: Vec<_> = iter.into_iter().map($conv).collect();
                let len = values.len();
                Array {
                    datatype: DataType::$datatype,
                    data: ArrayData::$variant(values),
                    validity: Validity::new_all_valid(len),
                }
            }
        }

        impl<$($gen)*> FromIterator<Option<$native>> for Array {
            fn from_iter<T: IntoIterator<Item = Option<$native>>>(iter: T) -> Self {
                let mut validity = Bitmap::default();
                let values: Vec<_> = iter
                    .into_iter()
                    .map(|v| {
                        validity.push(v.is_some());
                        v.map($conv).unwrap_or_default()
                    })
                    .collect();
                Array {
                    datatype: DataType::$datatype,
                    data: ArrayData::$variant(values),
                    validity: Validity::from_bitmap(validity),
                }
            }
        }
    };
}

impl_from_iter!([] bool, Boolean, Boolean, |v| v);
impl_from_iter!([] i16, Int16, Int16, |v| v);
impl_from_iter!([] i32, Int32, Int32, |v| v);
impl_from_iter!([] i64, Int64, Int64, |v| v);
impl_from_iter!([] f32, Float32, Float32, |v| v);
impl_from_iter!([] f64, Float64, Float64, |v| v);
impl_from_iter!(['a] &'a str, Utf8, Utf8, |v: &str| v.to_string());
impl_from_iter!([] String, Utf8, Utf8, |v| v);
impl_from_iter!(['a] &'a [u8], Binary, Binary, |v: &[u8]| v.to_vec());

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_iter_with_nulls() {
        let arr = Array::from_iter([Some(1i64), None, Some(3)]);
        assert_eq!(DataType::Int64, arr.datatype());
        assert!(arr.has_nulls());
        assert_eq!(ScalarValue::Int64(1), arr.logical_value(0).unwrap());
        assert_eq!(ScalarValue::Null, arr.logical_value(1).unwrap());
    }

    #[test]
    fn take_optional_nulls() {
        let arr = Array::from_iter(["a", "b", "c"]);
        let out = arr.take_optional([Some(2), None].into_iter()).unwrap();
        assert_eq!(ScalarValue::from("c"), out.logical_value(0).unwrap());
        assert_eq!(ScalarValue::Null, out.logical_value(1).unwrap());
    }

    #[test]
    fn append_keeps_validity() {
        let mut arr = Array::new_empty(DataType::Int32);
        arr.append_selected(&Array::from_iter([1i32, 2, 3]), [2, 1].into_iter())
            .unwrap();
        arr.append_selected(&Array::from_iter([None, Some(9i32)]), 0..2)
            .unwrap();

        let vals: Vec<_> = (0..4).map(|i| arr.logical_value(i).unwrap()).collect();
        assert_eq!(
            vec![
                ScalarValue::Int32(3),
                ScalarValue::Int32(2),
                ScalarValue::Null,
                ScalarValue::Int32(9),
            ],
            vals
        );
    }

    #[test]
    fn append_wrong_datatype() {
        let mut arr = Array::new_empty(DataType::Date32);
        arr.append_selected(&Array::from_iter([1i32]), 0..1)
            .unwrap_err();
    }

    #[test]
    fn from_scalars_with_nulls() {
        let scalars = [ScalarValue::from("x"), ScalarValue::Null];
        let arr = Array::try_from_scalars(DataType::Utf8, &scalars).unwrap();
        assert_eq!(ScalarValue::from("x"), arr.logical_value(0).unwrap());
        assert_eq!(ScalarValue::Null, arr.logical_value(1).unwrap());
    }

    #[test]
    fn from_scalars_wrong_type() {
        let scalars = [ScalarValue::Int32(4)];
        Array::try_from_scalars(DataType::Int64, &scalars).unwrap_err();
    }

    #[test]
    fn try_new_date32_over_int32() {
        let arr = Array::try_new(
            DataType::Date32,
            ArrayData::Int32(vec![19000]),
            Validity::new_all_valid(1),
        )
        .unwrap();
        assert_eq!(ScalarValue::Date32(19000), arr.logical_value(0).unwrap());
    }
}
