//! Coarse per-tree locking.
//!
//! Every layer tree owns exactly one [`TreeLock`]. Public layer operations take
//! it once for their whole duration and hand `&mut` state to internal helpers,
//! so nothing below the public surface ever locks again.

use std::cell::RefCell;
use std::sync::{Mutex, PoisonError};

thread_local! {
    static HELD_LOCKS: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

pub struct TreeLock<T> {
    inner: Mutex<T>,
}

impl<T> TreeLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Identity of the lock, taken from its address.
    ///
    /// Unique among live locks and stable while the lock stays in place; trees
    /// keep theirs behind an `Arc`.
    pub fn id(&self) -> u64 {
        std::ptr::from_ref(self) as usize as u64
    }

    /// Runs `f` with the lock held.
    ///
    /// Re-entering the same lock from inside `f` is a bug and trips a debug assertion
    /// instead of deadlocking silently. A poisoned lock is recovered; the guarded
    /// state is plain data and stays consistent between operations.
    pub fn scoped<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let id = self.id();
        let reentered = HELD_LOCKS.with(|held| held.borrow().contains(&id));
        debug_assert!(!reentered, "tree lock {id} acquired twice on one thread");

        let mut guard = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        HELD_LOCKS.with(|held| held.borrow_mut().push(id));
        let _release = HeldMarker(id);
        f(&mut guard)
    }

    pub fn is_held_by_current_thread(&self) -> bool {
        let id = self.id();
        HELD_LOCKS.with(|held| held.borrow().contains(&id))
    }
}

struct HeldMarker(u64);

impl Drop for HeldMarker {
    fn drop(&mut self) {
        HELD_LOCKS.with(|held| {
            let mut held = held.borrow_mut();
            if let Some(pos) = held.iter().rposition(|id| *id == self.0) {
                held.remove(pos);
            }
        });
    }
}

impl<T: Default> Default for TreeLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn scoped_access_is_serialized() {
        let lock = Arc::new(TreeLock::new(0u32));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let lock = Arc::clone(&lock);
                thread::spawn(move || {
                    for _ in 0..1000 {
                        lock.scoped(|n| *n += 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(lock.scoped(|n| *n), 4000);
    }

    #[test]
    fn held_marker_is_released() {
        let lock = TreeLock::new(());
        lock.scoped(|_| assert!(lock.is_held_by_current_thread()));
        assert!(!lock.is_held_by_current_thread());
    }

    #[test]
    fn poisoned_lock_recovers() {
        let lock = Arc::new(TreeLock::new(5));
        let poisoner = Arc::clone(&lock);
        let _ = thread::spawn(move || poisoner.scoped(|_| panic!("boom"))).join();
        assert_eq!(lock.scoped(|n| *n), 5);
    }

    #[test]
    fn distinct_locks_get_distinct_ids() {
        let (a, b) = (Arc::new(TreeLock::new(())), Arc::new(TreeLock::new(())));
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), Arc::clone(&a).id());
    }
}
