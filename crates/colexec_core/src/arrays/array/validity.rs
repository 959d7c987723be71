use crate::arrays::bitmap::Bitmap;

/// Validity mask for an array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    inner: ValidityInner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ValidityInner {
    /// No mask has been set, assume all entries valid.
    AllValid { len: usize },
    /// Mask has been set. Bitmap indicates which entries are valid or invalid.
    Mask { bitmap: Bitmap },
}

impl Validity {
    pub fn new_all_valid(len: usize) -> Self {
        Validity {
            inner: ValidityInner::AllValid { len },
        }
    }

    pub fn new_all_invalid(len: usize) -> Self {
        Validity {
            inner: ValidityInner::Mask {
                bitmap: Bitmap::new_with_all_false(len),
            },
        }
    }

    pub fn from_bitmap(bitmap: Bitmap) -> Self {
        Validity {
            inner: ValidityInner::Mask { bitmap },
        }
    }

    pub fn len(&self) -> usize {
        match &self.inner {
            ValidityInner::AllValid { len } => *len,
            ValidityInner::Mask { bitmap } => bitmap.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn all_valid(&self) -> bool {
        match &self.inner {
            ValidityInner::AllValid { .. } => true,
            ValidityInner::Mask { bitmap } => bitmap.is_all_true(),
        }
    }

    #[inline]
    pub fn is_valid(&self, idx: usize) -> bool {
        match &self.inner {
            ValidityInner::AllValid { .. } => true,
            ValidityInner::Mask { bitmap } => bitmap.value(idx),
        }
    }

    pub fn set_invalid(&mut self, idx: usize) {
        self.bitmap_mut().set_unchecked(idx, false);
    }

    pub fn set_valid(&mut self, idx: usize) {
        if let ValidityInner::Mask { bitmap } = &mut self.inner {
            bitmap.set_unchecked(idx, true);
        }
    }

    /// Append the validities at `indices` from `other`.
    pub fn append_selected(&mut self, other: &Validity, indices: impl Iterator<Item = usize>) {
        if let (ValidityInner::AllValid { len }, ValidityInner::AllValid { .. }) =
            (&mut self.inner, &other.inner)
        {
            *len += indices.count();
            return;
        }

        let bitmap = self.bitmap_mut();
        for idx in indices {
            bitmap.push(other.is_valid(idx));
        }
    }

    /// Create a new validity by selecting from this one.
    ///
    /// `None` entries produce an invalid slot.
    pub fn select_optional(&self, indices: impl Iterator<Item = Option<usize>>) -> Validity {
        let mut all_valid = matches!(self.inner, ValidityInner::AllValid { .. });
        let mut bitmap = Bitmap::default();
        for idx in indices {
            let valid = match idx {
                Some(idx) => self.is_valid(idx),
                None => false,
            };
            all_valid &= valid;
            bitmap.push(valid);
        }

        if all_valid {
            Validity::new_all_valid(bitmap.len())
        } else {
            Validity::from_bitmap(bitmap)
        }
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = bool> + '_ {
        (0..self.len()).map(|idx| self.is_valid(idx))
    }

    fn bitmap_mut(&mut self) -> &mut Bitmap {
        if let ValidityInner::AllValid { len } = self.inner {
            self.inner = ValidityInner::Mask {
                bitmap: Bitmap::new_with_all_true(len),
            };
        }
        match &mut self.inner {
            ValidityInner::Mask { bitmap } => bitmap,
            ValidityInner::AllValid { .. } => unreachable!("validity converted to mask"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_all_valid_stays_unmasked() {
        let mut v = Validity::new_all_valid(2);
        v.append_selected(&Validity::new_all_valid(4), [0, 3].into_iter());
        assert_eq!(4, v.len());
        assert!(v.all_valid());
    }

    #[test]
    fn append_with_invalid() {
        let mut other = Validity::new_all_valid(3);
        other.set_invalid(1);

        let mut v = Validity::new_all_valid(1);
        v.append_selected(&other, [1, 2].into_iter());

        assert_eq!(vec![true, false, true], v.iter().collect::<Vec<_>>());
    }

    #[test]
    fn select_optional_none_is_invalid() {
        let v = Validity::new_all_valid(3);
        let out = v.select_optional([Some(2), None, Some(0)].into_iter());
        assert_eq!(vec![true, false, true], out.iter().collect::<Vec<_>>());
    }
}
