pub mod array;
pub mod batch;
pub mod bitmap;
pub mod compute;
pub mod datatype;
pub mod scalar;
