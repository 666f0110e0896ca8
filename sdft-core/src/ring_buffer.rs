//! # Ring Buffer Module
//!
//! A fixed-size circular history used for two things:
//! - the shared sample history the frequency bins read their outgoing sample from
//! - the per-channel level history of the exact moving average
//!
//! The allocated size is always a power of two, so wrapping is a single mask.

/// Circular history of the most recent writes.
///
/// `read(offset)` looks backwards from the latest write: offset 0 is the
/// value written last, offset 1 the one before it, and so on. Slots that
/// were never written read as `T::default()`.
#[derive(Debug, Clone)]
pub struct RingBuffer<T> {
    buffer: Box<[T]>,
    mask: usize,
    // u64 so the counter cannot wrap during any realistic run.
    written: u64,
}

impl<T: Copy + Default> RingBuffer<T> {
    /// Allocates the smallest power of two that holds `requested_size + 1` values.
    ///
    /// # Arguments
    /// * `requested_size` - The largest offset the owner intends to read
    pub fn new(requested_size: usize) -> Self {
        let size = (requested_size + 1).next_power_of_two();
        Self {
            buffer: vec![T::default(); size].into_boxed_slice(),
            mask: size - 1,
            written: 0,
        }
    }

    /// Stores `value` as the latest entry.
    #[inline]
    pub fn write(&mut self, value: T) {
        let slot = (self.written as usize) & self.mask;
        self.buffer[slot] = value;
        self.written = self.written.wrapping_add(1);
    }

    /// Returns the value written `offset + 1` writes before the next one.
    ///
    /// Offsets at or beyond `capacity() - 1` alias newer slots; callers size
    /// the buffer so they never ask for those.
    #[inline]
    pub fn read(&self, offset: usize) -> T {
        let slot = self.written.wrapping_sub(offset as u64 + 1) as usize & self.mask;
        self.buffer[slot]
    }

    /// Number of slots actually allocated.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// log2 of the capacity.
    pub fn address_bits(&self) -> u32 {
        self.buffer.len().trailing_zeros()
    }

    /// Total number of writes so far.
    pub fn written(&self) -> u64 {
        self.written
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_next_power_of_two() {
        let cases = [(0, 1), (1, 2), (2, 4), (3, 4), (4, 8), (7, 8), (8, 16), (1704, 2048), (27262, 32768)];
        for (requested, expected) in cases {
            let ring = RingBuffer::<f32>::new(requested);
            assert_eq!(
                ring.capacity(),
                expected,
                "requested {} should allocate {}",
                requested,
                expected
            );
            assert!(ring.capacity() >= requested + 1);
            assert!(ring.capacity() / 2 < requested + 1);
        }
        assert_eq!(RingBuffer::<f32>::new(1704).address_bits(), 11);
    }

    #[test]
    fn test_read_looks_back_from_latest_write() {
        let mut ring = RingBuffer::<f32>::new(10);
        let capacity = ring.capacity();
        let values: Vec<f32> = (0..(capacity - 2)).map(|i| i as f32 * 1.5 + 1.0).collect();
        for &value in &values {
            ring.write(value);
        }

        for i in 0..values.len() {
            assert_eq!(ring.read(i), values[values.len() - 1 - i], "offset {}", i);
        }
    }

    #[test]
    fn test_wraps_around() {
        let mut ring = RingBuffer::<u32>::new(3);
        assert_eq!(ring.capacity(), 4);
        for i in 0..100u32 {
            ring.write(i);
        }
        assert_eq!(ring.written(), 100);
        assert_eq!(ring.read(0), 99);
        assert_eq!(ring.read(1), 98);
        assert_eq!(ring.read(2), 97);
    }

    #[test]
    fn test_unwritten_slots_read_as_default() {
        let mut ring = RingBuffer::<f32>::new(8);
        assert_eq!(ring.read(0), 0.0);
        ring.write(0.5);
        assert_eq!(ring.read(0), 0.5);
        assert_eq!(ring.read(5), 0.0);
    }
}
