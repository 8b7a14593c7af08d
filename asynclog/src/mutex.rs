use std::sync::Condvar;
use std::time::Duration;

/// Mutex that recovers from poisoning and, in debug builds, reports locks
/// that were held for an unexpectedly long time.
pub struct Mutex<T: ?Sized> {
    inner: std::sync::Mutex<T>,
}

impl<T: ?Sized + Default> Default for Mutex<T> {
    fn default() -> Self {
        Self {
            inner: std::sync::Mutex::new(Default::default()),
        }
    }
}

#[cfg(debug_assertions)]
const OVERHELD: Duration = Duration::from_millis(250);

#[cfg(debug_assertions)]
struct DropTracker {
    aquired: std::time::Instant,
    caller: &'static std::panic::Location<'static>,
    type_name: &'static str,
}

#[cfg(debug_assertions)]
impl DropTracker {
    fn new<T: ?Sized>(caller: &'static std::panic::Location<'static>) -> Self {
        Self {
            aquired: std::time::Instant::now(),
            caller,
            type_name: std::any::type_name::<T>(),
        }
    }
    fn restart(&mut self) {
        self.aquired = std::time::Instant::now();
    }
}

// Runs after the inner guard has been dropped, so the report is printed
// with the lock already released.
#[cfg(debug_assertions)]
impl Drop for DropTracker {
    #[inline(never)]
    fn drop(&mut self) {
        let held = self.aquired.elapsed();
        if held < OVERHELD {
            return;
        }
        eprintln!(
            "asynclog: lock on {} held for {:?}, acquired at {}:{}",
            self.type_name,
            held,
            self.caller.file(),
            self.caller.line()
        );
    }
}

pub struct MutexGuard<'a, T: ?Sized + 'a> {
    inner: std::sync::MutexGuard<'a, T>,
    #[cfg(debug_assertions)]
    tracker: DropTracker,
}

impl<T> Mutex<T> {
    pub const fn new(t: T) -> Mutex<T> {
        Mutex {
            inner: std::sync::Mutex::new(t),
        }
    }
}

impl<T: ?Sized> Mutex<T> {
    #[cfg_attr(debug_assertions, track_caller)]
    pub fn lock(&self) -> MutexGuard<'_, T> {
        let inner = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        MutexGuard {
            inner,
            #[cfg(debug_assertions)]
            tracker: DropTracker::new::<T>(std::panic::Location::caller()),
        }
    }
}

impl<'a, T> MutexGuard<'a, T> {
    /// Releases the lock until `condvar` is notified. Time spent waiting
    /// does not count as holding the lock.
    pub fn wait(self, condvar: &Condvar) -> MutexGuard<'a, T> {
        let inner = match condvar.wait(self.inner) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        #[cfg(debug_assertions)]
        let mut tracker = self.tracker;
        #[cfg(debug_assertions)]
        tracker.restart();
        MutexGuard {
            inner,
            #[cfg(debug_assertions)]
            tracker,
        }
    }

    /// Like [`MutexGuard::wait`] but gives up after `timeout`. Callers are
    /// expected to re-check their condition either way.
    pub fn wait_timeout(self, condvar: &Condvar, timeout: Duration) -> MutexGuard<'a, T> {
        let inner = match condvar.wait_timeout(self.inner, timeout) {
            Ok((guard, _)) => guard,
            Err(poisoned) => poisoned.into_inner().0,
        };
        #[cfg(debug_assertions)]
        let mut tracker = self.tracker;
        #[cfg(debug_assertions)]
        tracker.restart();
        MutexGuard {
            inner,
            #[cfg(debug_assertions)]
            tracker,
        }
    }
}

impl<T: ?Sized> std::ops::Deref for MutexGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl<T: ?Sized> std::ops::DerefMut for MutexGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.inner
    }
}
