//! Lock helpers shared by the stream and the loopback host.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock `mutex`, taking over the guard if a previous holder panicked.
///
/// Every protected value here stays consistent between statements, so a
/// poisoned lock is still safe to use.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_lock_recovers_poisoned_mutex() {
        let shared = Arc::new(Mutex::new(vec![1u8]));

        let worker = Arc::clone(&shared);
        let result = thread::spawn(move || {
            let mut guard = worker.lock().unwrap();
            guard.push(2);
            panic!("poison the lock");
        })
        .join();
        assert!(result.is_err());
        assert!(shared.is_poisoned());

        let mut guard = lock(&shared);
        assert_eq!(*guard, [1, 2]);
        guard.push(3);
        drop(guard);
        assert_eq!(*lock(&shared), [1, 2, 3]);
    }

    #[test]
    fn test_lock_unpoisoned() {
        let value = Mutex::new(7);
        *lock(&value) += 1;
        assert_eq!(*lock(&value), 8);
    }
}
