use std::fmt;

/// Growable packed bitmap.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Bitmap {
    len: usize,
    data: Vec<u64>,
}

impl Bitmap {
    pub fn new_with_all_true(len: usize) -> Self {
        let mut bitmap = Bitmap {
            len,
            data: vec![u64::MAX; len.div_ceil(64)],
        };
        bitmap.clear_trailing_bits();
        bitmap
    }

    pub fn new_with_all_false(len: usize) -> Self {
        Bitmap {
            len,
            data: vec![0; len.div_ceil(64)],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the value at the given index.
    ///
    /// Panics if out of bounds.
    #[inline]
    pub fn value(&self, idx: usize) -> bool {
        assert!(idx < self.len, "bitmap index {idx} out of bounds ({})", self.len);
        self.data[idx / 64] & (1 << (idx % 64)) != 0
    }

    /// Set a bit without checking the logical length.
    ///
    /// Panics if the index is past the end of the backing buffer.
    #[inline]
    pub fn set_unchecked(&mut self, idx: usize, val: bool) {
        let word = &mut self.data[idx / 64];
        if val {
            *word |= 1 << (idx % 64);
        } else {
            *word &= !(1 << (idx % 64));
        }
    }

    pub fn push(&mut self, val: bool) {
        if self.len.is_multiple_of(64) {
            self.data.push(0);
        }
        self.len += 1;
        self.set_unchecked(self.len - 1, val);
    }

    /// Count the number of set bits.
    pub fn count_trues(&self) -> usize {
        self.data.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_all_true(&self) -> bool {
        self.count_trues() == self.len
    }

    /// Iterator over the indices of set bits, in ascending order.
    pub fn index_iter(&self) -> BitmapIndexIter<'_> {
        BitmapIndexIter {
            bitmap: self,
            idx: 0,
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = bool> + '_ {
        (0..self.len).map(|idx| self.value(idx))
    }

    fn clear_trailing_bits(&mut self) {
        let rem = self.len % 64;
        if rem == 0 {
            return;
        }
        if let Some(last) = self.data.last_mut() {
            *last &= (1 << rem) - 1;
        }
    }
}

impl FromIterator<bool> for Bitmap {
    fn from_iter<T: IntoIterator<Item = bool>>(iter: T) -> Self {
        let iter = iter.into_iter();
        let mut bitmap = Bitmap {
            len: 0,
            data: Vec::with_capacity(iter.size_hint().0.div_ceil(64)),
        };
        for v in iter {
            bitmap.push(v);
        }
        bitmap
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.iter().map(|b| if b { 1 } else { 0 }))
            .finish()
    }
}

#[derive(Debug)]
pub struct BitmapIndexIter<'a> {
    bitmap: &'a Bitmap,
    idx: usize,
}

impl Iterator for BitmapIndexIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        while self.idx < self.bitmap.len {
            let word = self.bitmap.data[self.idx / 64] >> (self.idx % 64);
            if word == 0 {
                // Skip the rest of this word.
                self.idx = (self.idx / 64 + 1) * 64;
                continue;
            }
            self.idx += word.trailing_zeros() as usize;
            if self.idx >= self.bitmap.len {
                break;
            }
            let found = self.idx;
            self.idx += 1;
            return Some(found);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_true_count() {
        let bm = Bitmap::new_with_all_true(70);
        assert_eq!(70, bm.count_trues());
        assert!(bm.is_all_true());
    }

    #[test]
    fn all_true_word_aligned() {
        for len in [0, 64, 128] {
            let bm = Bitmap::new_with_all_true(len);
            assert_eq!(len, bm.count_trues());
        }
        let mut bm = Bitmap::new_with_all_true(64);
        bm.push(false);
        assert_eq!(64, bm.count_trues());
        assert_eq!(65, bm.len());
    }

    #[test]
    fn push_and_get() {
        let mut bm = Bitmap::default();
        for i in 0..130 {
            bm.push(i % 3 == 0);
        }
        assert_eq!(130, bm.len());
        assert!(bm.value(0));
        assert!(!bm.value(1));
        assert!(bm.value(129));
    }

    #[test]
    fn index_iter_across_words() {
        let mut bm = Bitmap::new_with_all_false(200);
        bm.set_unchecked(3, true);
        bm.set_unchecked(64, true);
        bm.set_unchecked(199, true);

        let indices: Vec<_> = bm.index_iter().collect();
        assert_eq!(vec![3, 64, 199], indices);
    }

    #[test]
    fn index_iter_all_false() {
        let bm = Bitmap::new_with_all_false(65);
        assert_eq!(0, bm.index_iter().count());
    }
}
