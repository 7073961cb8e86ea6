//! Thread-safe counter for CoAP message IDs.
//!
//! # What is a message ID? (for beginners)
//!
//! Every CoAP message carries a 16-bit *message ID*.  The receiver copies the
//! ID of a confirmable request into its Acknowledgement (or Reset), which is
//! how the sender knows which request an ACK belongs to.  IDs only need to be
//! unique among the exchanges that are in flight at the same time, so a
//! simple wrapping counter is enough.
//!
//! # Thread safety
//!
//! The counter uses `AtomicU16` internally, so concurrent HTTP requests can
//! all draw IDs from one shared counter without a lock and without two
//! requests ever receiving the same value back-to-back.

use std::sync::atomic::{AtomicU16, Ordering};

/// A thread-safe, wrapping counter for CoAP message IDs.
///
/// # Examples
///
/// ```rust
/// use coap_core::MessageIdCounter;
///
/// let counter = MessageIdCounter::starting_at(7);
/// assert_eq!(counter.next(), 7);
/// assert_eq!(counter.next(), 8);
/// ```
#[derive(Debug)]
pub struct MessageIdCounter {
    inner: AtomicU16,
}

impl MessageIdCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter whose first ID is `first`.
    ///
    /// RFC 7252 recommends a randomised starting value so that IDs from a
    /// restarted process do not collide with IDs the device still remembers.
    pub fn starting_at(first: u16) -> Self {
        Self {
            inner: AtomicU16::new(first),
        }
    }

    /// Returns the next message ID and atomically advances the counter.
    ///
    /// Wraps from `u16::MAX` to 0 without panicking.
    pub fn next(&self) -> u16 {
        // `fetch_add` on atomics always wraps on overflow.
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the ID the next call to [`next`](Self::next) would hand out.
    pub fn current(&self) -> u16 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for MessageIdCounter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_message_id_counter_starts_at_zero() {
        // Arrange
        let counter = MessageIdCounter::new();

        // Act
        let first = counter.next();

        // Assert
        assert_eq!(first, 0);
    }

    #[test]
    fn test_message_id_counter_starting_at_custom_value() {
        let counter = MessageIdCounter::starting_at(0x1234);
        assert_eq!(counter.next(), 0x1234);
        assert_eq!(counter.next(), 0x1235);
    }

    #[test]
    fn test_message_id_counter_wraps_at_u16_max() {
        // Arrange – start the counter one step before overflow
        let counter = MessageIdCounter::starting_at(u16::MAX);

        // Act
        let before_wrap = counter.next();
        let after_wrap = counter.next();

        // Assert
        assert_eq!(before_wrap, u16::MAX);
        assert_eq!(after_wrap, 0, "counter must wrap to 0 after u16::MAX");
    }

    #[test]
    fn test_message_id_counter_is_thread_safe() {
        // Arrange
        let counter = Arc::new(MessageIdCounter::new());
        let thread_count = 8;
        let ids_per_thread = 1000;

        // Act – draw IDs from many threads simultaneously
        let handles: Vec<_> = (0..thread_count)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || (0..ids_per_thread).map(|_| c.next()).collect::<Vec<_>>())
            })
            .collect();

        let mut all_ids: Vec<u16> = handles
            .into_iter()
            .flat_map(|h| h.join().expect("thread panicked"))
            .collect();

        // Assert – 8000 draws fit in u16 space, so every ID must be unique
        all_ids.sort_unstable();
        all_ids.dedup();
        assert_eq!(all_ids.len(), thread_count * ids_per_thread);
    }

    #[test]
    fn test_current_does_not_advance() {
        let counter = MessageIdCounter::new();
        counter.next();

        assert_eq!(counter.current(), 1);
        assert_eq!(counter.next(), 1);
    }
}
