//! Monotonic record id allocation

/// Hands out record ids in increasing order.
///
/// Ids of frame-derived records are their frame ordinals; the allocator is
/// kept above the largest id seen so derived records never collide with them.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    next: u32,
}

impl IdAllocator {
    /// Allocator whose first id follows `max`, or starts at 0 when there is none
    pub fn after(max: Option<u32>) -> Self {
        Self {
            next: max.map_or(0, |m| m.saturating_add(1)),
        }
    }

    /// Mark `id` as taken by an externally numbered record
    pub fn reserve(&mut self, id: u32) {
        if id >= self.next {
            self.next = id.saturating_add(1);
        }
    }

    /// Take the next id
    pub fn next_id(&mut self) -> u32 {
        let id = self.next;
        self.next = self.next.saturating_add(1);
        id
    }

    /// The id the next call to [`IdAllocator::next_id`] will return
    #[cfg(test)]
    fn peek(&self) -> u32 {
        self.next
    }
}
