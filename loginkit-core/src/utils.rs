use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::{rngs::OsRng, RngCore};

/// Locks a mutex, recovering the data if a previous holder panicked.
///
/// The guarded values in this crate are plain maps that stay consistent
/// between statements, so a poisoned lock carries no torn state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// `len` bytes from the operating system's CSPRNG.
pub(crate) fn os_random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_bytes_have_requested_length() {
        assert_eq!(os_random_bytes(32).len(), 32);
        assert_ne!(os_random_bytes(32), os_random_bytes(32));
    }

    #[test]
    fn poisoned_lock_is_recovered() {
        let mutex = std::sync::Arc::new(Mutex::new(1));
        let cloned = mutex.clone();
        let _ = std::thread::spawn(move || {
            let _guard = cloned.lock().unwrap();
            panic!("poison");
        })
        .join();
        assert_eq!(*lock(&mutex), 1);
    }
}
