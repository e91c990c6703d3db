//! Lazy, restartable partition of the item index space into fixed-size batches

use std::ops::Range;

/// One contiguous run of item column indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemBatch {
    /// Position of the batch in the partition
    pub index: usize,
    pub items: Range<usize>,
}

impl ItemBatch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Partition of `0..n_items` into batches of `batch_size`.
///
/// Nothing is materialised; each call to `iter` starts a fresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemBatches {
    n_items: usize,
    batch_size: usize,
}

impl ItemBatches {
    /// `batch_size` of zero is treated as one
    pub fn new(n_items: usize, batch_size: usize) -> Self {
        Self {
            n_items,
            batch_size: batch_size.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.n_items.div_ceil(self.batch_size)
    }

    pub fn is_empty(&self) -> bool {
        self.n_items == 0
    }

    pub fn get(&self, index: usize) -> Option<ItemBatch> {
        let start = index.checked_mul(self.batch_size)?;
        if start >= self.n_items {
            return None;
        }
        let end = (start + self.batch_size).min(self.n_items);
        Some(ItemBatch {
            index,
            items: start..end,
        })
    }

    pub fn iter(&self) -> BatchIter {
        BatchIter {
            batches: *self,
            next: 0,
        }
    }
}

impl IntoIterator for ItemBatches {
    type Item = ItemBatch;
    type IntoIter = BatchIter;

    fn into_iter(self) -> BatchIter {
        self.iter()
    }
}

/// Iterator over the batches of an `ItemBatches`
#[derive(Debug, Clone)]
pub struct BatchIter {
    batches: ItemBatches,
    next: usize,
}

impl Iterator for BatchIter {
    type Item = ItemBatch;

    fn next(&mut self) -> Option<ItemBatch> {
        let batch = self.batches.get(self.next)?;
        self.next += 1;
        Some(batch)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.batches.len().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BatchIter {}
