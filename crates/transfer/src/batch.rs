use std::iter::FusedIterator;

/// Splits `items` into order-preserving groups of `size`.
///
/// Every group holds exactly `size` items except possibly the last, which
/// holds the remainder. A `size` of 0 yields no groups at all.
pub fn partition<I>(items: I, size: usize) -> Batches<I::IntoIter>
where
    I: IntoIterator,
{
    Batches::new(items.into_iter(), size)
}

/// Lazy partitioner over an item source.
///
/// Holds at most one in-flight group; emitted items are never re-read.
#[derive(Debug)]
pub struct Batches<I> {
    source: I,
    size: usize,
    done: bool,
}

impl<I: Iterator> Batches<I> {
    pub fn new(source: I, size: usize) -> Self {
        Self {
            source,
            size,
            done: size == 0,
        }
    }

    /// Configured group size.
    pub fn batch_size(&self) -> usize {
        self.size
    }
}

impl<I: Iterator> Iterator for Batches<I> {
    type Item = Vec<I::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut group = Vec::with_capacity(self.size);
        while group.len() < self.size {
            match self.source.next() {
                Some(item) => group.push(item),
                None => {
                    self.done = true;
                    break;
                }
            }
        }

        if group.is_empty() { None } else { Some(group) }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            return (0, Some(0));
        }
        let (lo, hi) = self.source.size_hint();
        (lo.div_ceil(self.size), hi.map(|h| h.div_ceil(self.size)))
    }
}

impl<I: Iterator> FusedIterator for Batches<I> {}
