use crate::{CodecError, CodecResult};

/// The outcome of one item of a batch.
#[derive(Debug)]
pub struct BatchItem<T> {
    /// Position of the item in the input.
    pub index: usize,
    /// Claim id or transaction control number.
    pub id: String,
    pub result: CodecResult<T>,
}

/// Per-item results of a batch operation, in input order.
///
/// A failing item never aborts the batch; it is recorded here next to the successes.
#[derive(Debug)]
pub struct BatchResult<T> {
    pub items: Vec<BatchItem<T>>,
}

impl<T> BatchResult<T> {
    pub fn successes(&self) -> impl Iterator<Item = (&BatchItem<T>, &T)> {
        self.items
            .iter()
            .filter_map(|item| item.result.as_ref().ok().map(|value| (item, value)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&BatchItem<T>, &CodecError)> {
        self.items
            .iter()
            .filter_map(|item| item.result.as_ref().err().map(|err| (item, err)))
    }

    pub fn success_count(&self) -> usize {
        self.successes().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_complete(&self) -> bool {
        self.items.iter().all(|item| item.result.is_ok())
    }
}

impl<T> Default for BatchResult<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> FromIterator<BatchItem<T>> for BatchResult<T> {
    fn from_iter<I: IntoIterator<Item = BatchItem<T>>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
