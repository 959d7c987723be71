/// Logical-to-physical row mapping for a batch.
#[derive(Debug, Clone, Copy)]
pub enum Selection<'a> {
    /// Represents a linear selection.
    ///
    /// '0..len'
    Linear { len: usize },
    /// Physical row for each logical row, in output order. Indices may repeat.
    Slice(&'a [usize]),
}

impl<'a> Selection<'a> {
    pub fn linear(len: usize) -> Self {
        Self::Linear { len }
    }

    pub fn slice(sel: &'a [usize]) -> Self {
        Self::Slice(sel)
    }

    pub fn is_linear(&self) -> bool {
        matches!(self, Selection::Linear { .. })
    }

    pub fn iter(&self) -> FlatSelectionIter<'a> {
        FlatSelectionIter { idx: 0, sel: *self }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Linear { len } => *len,
            Self::Slice(sel) => sel.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, idx: usize) -> Option<usize> {
        match self {
            Self::Linear { len } => {
                if idx >= *len {
                    None
                } else {
                    Some(idx)
                }
            }
            Self::Slice(sel) => sel.get(idx).copied(),
        }
    }
}

impl<'a> IntoIterator for Selection<'a> {
    type Item = usize;
    type IntoIter = FlatSelectionIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        FlatSelectionIter { idx: 0, sel: self }
    }
}

#[derive(Debug, Clone)]
pub struct FlatSelectionIter<'a> {
    idx: usize,
    sel: Selection<'a>,
}

impl Iterator for FlatSelectionIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.sel.len() {
            return None;
        }

        let v = match self.sel {
            Selection::Linear { .. } => self.idx,
            Selection::Slice(sel) => sel[self.idx],
        };

        self.idx += 1;

        Some(v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.sel.len() - self.idx;
        (rem, Some(rem))
    }
}

impl ExactSizeIterator for FlatSelectionIter<'_> {}
