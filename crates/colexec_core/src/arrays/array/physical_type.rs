use std::fmt::{self, Debug};

use colexec_error::{DbError, Result};

use super::array_data::ArrayData;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicalType {
    Boolean,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Utf8,
    Binary,
}

impl PhysicalType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "Boolean",
            Self::Int16 => "Int16",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Float32 => "Float32",
            Self::Float64 => "Float64",
            Self::Utf8 => "Utf8",
            Self::Binary => "Binary",
        }
    }
}

impl fmt::Display for PhysicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Represents an in-memory array that can be indexed into to retrieve values.
pub trait Addressable<'a>: Debug {
    /// The type that get's returned.
    type T: Debug + ?Sized;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get a value at the given index.
    fn get(&self, idx: usize) -> Option<&'a Self::T>;
}

impl<'a, T> Addressable<'a> for &'a [T]
where
    T: Debug,
{
    type T = T;

    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, idx: usize) -> Option<&'a Self::T> {
        (**self).get(idx)
    }
}

/// Addressable view over owned strings, yielding `str`.
#[derive(Debug, Clone, Copy)]
pub struct StrAddressable<'a> {
    values: &'a [String],
}

impl<'a> Addressable<'a> for StrAddressable<'a> {
    type T = str;

    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, idx: usize) -> Option<&'a Self::T> {
        self.values.get(idx).map(|s| s.as_str())
    }
}

/// Addressable view over owned byte buffers, yielding `[u8]`.
#[derive(Debug, Clone, Copy)]
pub struct BinaryAddressable<'a> {
    values: &'a [Vec<u8>],
}

impl<'a> Addressable<'a> for BinaryAddressable<'a> {
    type T = [u8];

    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, idx: usize) -> Option<&'a Self::T> {
        self.values.get(idx).map(|b| b.as_slice())
    }
}

/// Helper trait for getting the underlying data for an array.
///
/// Kernels are written generically over this trait and monomorphized for
/// each physical type. Dispatch on `PhysicalType` happens once per array.
pub trait PhysicalStorage: Debug + Sync + Send + Clone + Copy + 'static {
    const PHYSICAL_TYPE: PhysicalType;

    /// The logical type being stored that may be accessed.
    type StorageType: Debug + ?Sized;

    /// The type of the addressable storage.
    type Addressable<'a>: Addressable<'a, T = Self::StorageType>;

    /// Get addressable storage for indexing directly into the underlying data.
    fn get_addressable(data: &ArrayData) -> Result<Self::Addressable<'_>>;
}

fn storage_mismatch(data: &ArrayData, want: PhysicalType) -> DbError {
    DbError::new("Invalid physical storage for array data")
        .with_field("need", want)
        .with_field("have", data.physical_type())
}

macro_rules! generate_primitive {
    ($prim:ty, $name:ident, $variant:ident) => {
        #[derive(Debug, Clone, Copy)]
        pub struct $name;

        impl PhysicalStorage for $name {
            const PHYSICAL_TYPE: PhysicalType = PhysicalType::$variant;

            type StorageType = $prim;
            type Addressable<'a> = &'a [$prim];

            fn get_addressable(data: &ArrayData) -> Result<Self::Addressable<'_>> {
                match data {
                    ArrayData::$variant(values) => Ok(values.as_slice()),
                    other => Err(storage_mismatch(other, Self::PHYSICAL_TYPE)),
                }
            }
        }
    };
}

generate_primitive!(bool, PhysicalBool, Boolean);
generate_primitive!(i16, PhysicalI16, Int16);
generate_primitive!(i32, PhysicalI32, Int32);
generate_primitive!(i64, PhysicalI64, Int64);
generate_primitive!(f32, PhysicalF32, Float32);
generate_primitive!(f64, PhysicalF64, Float64);

#[derive(Debug, Clone, Copy)]
pub struct PhysicalUtf8;

impl PhysicalStorage for PhysicalUtf8 {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::Utf8;

    type StorageType = str;
    type Addressable<'a> = StrAddressable<'a>;

    fn get_addressable(data: &ArrayData) -> Result<Self::Addressable<'_>> {
        match data {
            ArrayData::Utf8(values) => Ok(StrAddressable { values }),
            other => Err(storage_mismatch(other, Self::PHYSICAL_TYPE)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PhysicalBinary;

impl PhysicalStorage for PhysicalBinary {
    const PHYSICAL_TYPE: PhysicalType = PhysicalType::Binary;

    type StorageType = [u8];
    type Addressable<'a> = BinaryAddressable<'a>;

    fn get_addressable(data: &ArrayData) -> Result<Self::Addressable<'_>> {
        match data {
            ArrayData::Binary(values) => Ok(BinaryAddressable { values }),
            other => Err(storage_mismatch(other, Self::PHYSICAL_TYPE)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addressable_wrong_storage() {
        let data = ArrayData::Int64(vec![1, 2]);
        let err = PhysicalI32::get_addressable(&data).unwrap_err();
        assert_eq!(Some("Int32"), err.get_field("need"));
        assert_eq!(Some("Int64"), err.get_field("have"));
    }

    #[test]
    fn utf8_addressable() {
        let data = ArrayData::Utf8(vec!["a".to_string(), "bc".to_string()]);
        let addr = PhysicalUtf8::get_addressable(&data).unwrap();
        assert_eq!(2, addr.len());
        assert_eq!(Some("bc"), addr.get(1));
        assert_eq!(None, addr.get(2));
    }
}
