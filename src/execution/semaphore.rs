use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Caps how many files are processed at once, independently of the pool size.
///
/// Slots are held by an [`InFlightPermit`] and returned when it is dropped, so a panicking task
/// still frees its slot.
#[derive(Debug)]
pub struct InFlightLimit {
    free: Mutex<usize>,
    freed: Condvar,
}

/// A held slot of an [`InFlightLimit`].
#[derive(Debug)]
pub struct InFlightPermit<'a> {
    limit: &'a InFlightLimit,
}

impl InFlightLimit {
    /// A limit of `slots` concurrent holders (at least one).
    pub fn new(slots: usize) -> Self {
        Self {
            free: Mutex::new(slots.max(1)),
            freed: Condvar::new(),
        }
    }

    /// Block until a slot is free. Returns the permit and how long the caller waited.
    pub fn enter(&self) -> (InFlightPermit<'_>, Duration) {
        let start = Instant::now();
        let mut blocked = false;
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        while *free == 0 {
            blocked = true;
            free = self.freed.wait(free).unwrap_or_else(PoisonError::into_inner);
        }
        *free -= 1;
        let waited = if blocked { start.elapsed() } else { Duration::ZERO };
        (InFlightPermit { limit: self }, waited)
    }

    fn leave(&self) {
        let mut free = self.free.lock().unwrap_or_else(PoisonError::into_inner);
        *free += 1;
        self.freed.notify_one();
    }
}

impl Drop for InFlightPermit<'_> {
    fn drop(&mut self) {
        self.limit.leave();
    }
}

#[cfg(test)]
mod tests {
    use super::InFlightLimit;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn second_holder_waits_until_first_permit_drops() {
        let limit = Arc::new(InFlightLimit::new(1));
        let (permit, waited) = limit.enter();
        assert_eq!(waited, Duration::ZERO);

        let limit2 = Arc::clone(&limit);
        let handle = std::thread::spawn(move || limit2.enter().1);
        std::thread::sleep(Duration::from_millis(20));
        drop(permit);

        let waited = handle.join().unwrap();
        assert!(waited > Duration::ZERO);
    }

    #[test]
    fn zero_slots_behaves_as_one() {
        let limit = InFlightLimit::new(0);
        let (_permit, waited) = limit.enter();
        assert_eq!(waited, Duration::ZERO);
    }
}
