//! Fixed-capacity connection slot table.
//!
//! Each entry owns its connection exclusively; a slot index is stable for
//! the life of a connection and reused (not reallocated) once freed.
//! Capacity is a hard limit: `acquire` hands the connection back instead
//! of queueing when the table is full, and the caller must drop it.

/// Owned, bounds-checked table of connection slots.
#[derive(Debug)]
pub struct SlotTable<T> {
    slots: Vec<Option<T>>,
}

impl<T> SlotTable<T> {
    /// Create a table with `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self { slots }
    }

    /// Number of slots, live or free.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of live slots.
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Whether the slot at `index` holds a connection.
    pub fn is_live(&self, index: usize) -> bool {
        self.slots.get(index).is_some_and(|s| s.is_some())
    }

    /// Install `conn` into the lowest free slot and return its index.
    ///
    /// Returns the connection back as `Err` when every slot is live -
    /// the caller rejects (closes) it immediately, never queues it.
    pub fn acquire(&mut self, conn: T) -> Result<usize, T> {
        match self.slots.iter().position(|s| s.is_none()) {
            Some(index) => {
                self.slots[index] = Some(conn);
                Ok(index)
            }
            None => Err(conn),
        }
    }

    /// Free the slot at `index`, returning its connection (dropping the
    /// returned value closes the socket).
    pub fn release(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    /// Mutable access to the connection at `index`, if live.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.slots.get_mut(index).and_then(Option::as_mut)
    }

    /// Indices of live slots, ascending.
    pub fn live_indices(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.is_some().then_some(i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn acquire_fills_lowest_index_first() {
        let mut table = SlotTable::new(3);
        assert_eq!(table.acquire("a"), Ok(0));
        assert_eq!(table.acquire("b"), Ok(1));
        assert_eq!(table.acquire("c"), Ok(2));
        assert_eq!(table.live_count(), 3);
    }

    #[test]
    fn full_table_returns_the_connection() {
        let mut table = SlotTable::new(2);
        table.acquire("a").unwrap();
        table.acquire("b").unwrap();
        assert_eq!(table.acquire("c"), Err("c"));
        assert_eq!(table.live_count(), 2);
    }

    #[test]
    fn released_slot_is_reused_not_reallocated() {
        let mut table = SlotTable::new(3);
        table.acquire("a").unwrap();
        table.acquire("b").unwrap();
        table.acquire("c").unwrap();

        assert_eq!(table.release(1), Some("b"));
        assert!(!table.is_live(1));

        // The freed index is claimed by the next connection.
        assert_eq!(table.acquire("d"), Ok(1));
        assert_eq!(table.live_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn live_indices_ascend() {
        let mut table = SlotTable::new(4);
        table.acquire("a").unwrap();
        table.acquire("b").unwrap();
        table.acquire("c").unwrap();
        table.release(0);
        assert_eq!(table.live_indices(), vec![1, 2]);
    }

    #[test]
    fn release_of_free_slot_is_a_no_op() {
        let mut table: SlotTable<&str> = SlotTable::new(2);
        assert_eq!(table.release(0), None);
        assert_eq!(table.release(99), None);
    }
}
