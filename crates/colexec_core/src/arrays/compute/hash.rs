use ahash::RandomState;
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
use crate::arrays::array::selection::Selection;

/// State used for hashing variable-length values.
///
/// Fixed seeds so that hashes are stable across runs.
pub const HASH_RANDOM_STATE: RandomState = RandomState::with_seeds(0, 0, 0, 0);

/// Multiplier used when folding a column hash into the running row hash.
pub const HASH_COMBINE_FACTOR: u64 = 31;

/// Fold a column value hash into an accumulated row hash.
#[inline]
pub const fn combine_hash(acc: u64, hash: u64) -> u64 {
    acc.wrapping_mul(HASH_COMBINE_FACTOR).wrapping_add(hash)
}

/// Fold the hashes of the selected values of `arr` into `hashes`.
///
/// `hashes[i]` is updated with the value at physical row `sel[i]`. Nulls are
/// not special-cased, the value stored in a null slot is hashed like any other.
/// Callers are expected to reject null keys when verifying matches.
pub fn rehash_array(arr: &Array, sel: Selection, hashes: &mut [u64]) -> Result<()> {
    match arr.datatype().physical_type() {
        PhysicalType::Boolean => rehash_array_inner::<PhysicalBool>(arr, sel, hashes),
        PhysicalType::Int16 => rehash_array_inner::<PhysicalI16>(arr, sel, hashes),
        PhysicalType::Int32 => rehash_array_inner::<PhysicalI32>(arr, sel, hashes),
        PhysicalType::Int64 => rehash_array_inner::<PhysicalI64>(arr, sel, hashes),
        PhysicalType::Float32 => rehash_array_inner::<PhysicalF32>(arr, sel, hashes),
        PhysicalType::Float64 => rehash_array_inner::<PhysicalF64>(arr, sel, hashes),
        PhysicalType::Utf8 => rehash_array_inner::<PhysicalUtf8>(arr, sel, hashes),
        PhysicalType::Binary => rehash_array_inner::<PhysicalBinary>(arr, sel, hashes),
    }
}

fn rehash_array_inner<S>(arr: &Array, sel: Selection, hashes: &mut [u64]) -> Result<()>
where
    S: PhysicalStorage,
    S::StorageType: HashValue,
{
    debug_assert_eq!(sel.len(), hashes.len());

    let values = S::get_addressable(arr.data())?;
    for (idx, hash) in sel.iter().zip(hashes.iter_mut()) {
        let v = values.get(idx).ok_or_else(|| {
            DbError::new("Missing value for hashing")
                .with_field("index", idx)
                .with_field("len", values.len())
        })?;
        *hash = combine_hash(*hash, v.hash_one());
    }

    Ok(())
}

/// Helper trait for hashing values.
///
/// Must be a pure function of the value, and values that compare equal must
/// produce the same hash.
pub trait HashValue {
    fn hash_one(&self) -> u64;
}

impl HashValue for bool {
    fn hash_one(&self) -> u64 {
        *self as u64
    }
}

macro_rules! impl_hash_value_int {
    ($typ:ty) => {
        impl HashValue for $typ {
            fn hash_one(&self) -> u64 {
                // Sign extend so equal values hash the same regardless of
                // width.
                *self as i64 as u64
            }
        }
    };
}

impl_hash_value_int!(i16);
impl_hash_value_int!(i32);
impl_hash_value_int!(i64);

impl HashValue for f32 {
    fn hash_one(&self) -> u64 {
        (*self as f64).hash_one()
    }
}

impl HashValue for f64 {
    fn hash_one(&self) -> u64 {
        // -0.0 == 0.0
        if *self == 0.0 {
            0.0f64.to_bits()
        } else {
            self.to_bits()
        }
    }
}

impl HashValue for str {
    fn hash_one(&self) -> u64 {
        HASH_RANDOM_STATE.hash_one(self.as_bytes())
    }
}

impl HashValue for [u8] {
    fn hash_one(&self) -> u64 {
        HASH_RANDOM_STATE.hash_one(self)
    }
}
