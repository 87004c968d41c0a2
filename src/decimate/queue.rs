/*!
Priority queue that supports removing arbitrary entries. Entries are kept in
an ordered set, so the smallest entry is always at the front, and an entry can
be removed by passing an equal value. Entries must therefore be unique.
*/

use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct PQueue<T>
where
    T: Ord,
{
    items: BTreeSet<T>,
}

impl<T> Default for PQueue<T>
where
    T: Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> PQueue<T>
where
    T: Ord,
{
    pub fn new() -> Self {
        PQueue {
            items: BTreeSet::new(),
        }
    }

    /// Returns `false` if an equal entry is already queued.
    pub fn insert(&mut self, item: T) -> bool {
        self.items.insert(item)
    }

    /// Returns `false` if no equal entry was queued.
    pub fn remove(&mut self, item: &T) -> bool {
        self.items.remove(item)
    }

    /// The smallest entry.
    pub fn top(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_first()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod test {
    use arrayvec::ArrayVec;

    use super::PQueue;

    #[test]
    fn t_pqueue_sorted() {
        // Insert integers in a weird order, and expect them to come out sorted.
        let mut queue = PQueue::new();
        for i in [8, 1, 5, 3, 9, 2, 6, 4, 7] {
            assert!(queue.insert(i));
        }
        assert!(!queue.insert(5));
        assert_eq!(9, queue.len());
        assert_eq!(Some(&1), queue.top());
        let mut sorted = ArrayVec::<i32, 9>::new();
        while let Some(i) = queue.pop() {
            sorted.push(i);
        }
        assert_eq!(&[1, 2, 3, 4, 5, 6, 7, 8, 9], sorted.as_slice());
        assert!(queue.is_empty());
    }

    #[test]
    fn t_pqueue_remove() {
        let mut queue = PQueue::new();
        for i in [4, 2, 7, 1] {
            queue.insert(i);
        }
        assert!(queue.remove(&1));
        assert!(!queue.remove(&1));
        assert_eq!(Some(&2), queue.top());
        assert!(queue.remove(&7));
        let rest: ArrayVec<i32, 4> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(&[2, 4], rest.as_slice());
        queue.insert(3);
        queue.clear();
        assert_eq!(None, queue.top());
    }
}
