use std::collections::VecDeque;
use std::fmt::Debug;

use colexec_error::Result;

use crate::arrays::batch::Batch;

/// A pull-based producer of batches.
pub trait BatchSource: Debug {
    /// Pull the next batch.
    ///
    /// A batch with zero rows indicates the source is exhausted. Sources should
    /// keep returning empty batches if pulled after that.
    fn next_batch(&mut self) -> Result<Batch>;
}

impl<S> BatchSource for Box<S>
where
    S: BatchSource + ?Sized,
{
    fn next_batch(&mut self) -> Result<Batch> {
        (**self).next_batch()
    }
}

/// Source that replays batches held in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    batches: VecDeque<Batch>,
}

impl MemorySource {
    pub fn new(batches: impl IntoIterator<Item = Batch>) -> Self {
        MemorySource {
            batches: batches.into_iter().collect(),
        }
    }

    /// Number of batches not yet pulled.
    pub fn remaining(&self) -> usize {
        self.batches.len()
    }
}

impl BatchSource for MemorySource {
    fn next_batch(&mut self) -> Result<Batch> {
        // Skip over batches that happen to have no rows so they aren't
        // mistaken for the end of the stream.
        while let Some(batch) = self.batches.pop_front() {
            if batch.num_rows() > 0 {
                return Ok(batch);
            }
        }
        Ok(Batch::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::array::Array;

    #[test]
    fn memory_source_skips_empty() {
        let mut source = MemorySource::new([
            Batch::try_from_arrays([Array::from_iter([1i64])]).unwrap(),
            Batch::empty(),
            Batch::try_from_arrays([Array::from_iter([2i64])]).unwrap(),
        ]);

        assert_eq!(1, source.next_batch().unwrap().num_rows());
        assert_eq!(1, source.next_batch().unwrap().num_rows());
        assert_eq!(0, source.next_batch().unwrap().num_rows());
        assert_eq!(0, source.next_batch().unwrap().num_rows());
        assert_eq!(0, source.remaining());
    }
}
