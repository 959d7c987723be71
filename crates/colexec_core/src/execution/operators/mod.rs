pub mod hash_join;
pub mod source;

pub use source::{BatchSource, MemorySource};

/// Properties that apply to all operators in a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionProperties {
    /// Max number of rows an operator may emit in a single batch.
    pub batch_size: usize,
}
