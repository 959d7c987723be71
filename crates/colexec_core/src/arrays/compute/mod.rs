pub mod hash;
pub mod key_eq;
