//! Watchdog Guard — a scoped renew-before-and-after lease.
//!
//! Any operation whose duration is not provably shorter than the watchdog
//! window runs inside a [`WatchdogGuard`]: the watchdog is fed when the
//! guard is created and again when it is dropped, on every path out of
//! the scope (early return and `?` included).
//!
//! ```text
//!   let mut adc = WatchdogGuard::new(board);   // feed
//!   sampler.sample(channel, &mut *adc)?;       // blocking conversion
//!   drop(adc);                                 // feed
//! ```

use core::ops::{Deref, DerefMut};

use crate::app::ports::WatchdogPort;

/// Feeds `W` on construction and on drop; derefs to `W` in between so
/// the guarded operation can use the same peripheral bundle.
pub struct WatchdogGuard<'a, W: WatchdogPort> {
    inner: &'a mut W,
}

impl<'a, W: WatchdogPort> WatchdogGuard<'a, W> {
    pub fn new(inner: &'a mut W) -> Self {
        inner.feed();
        Self { inner }
    }
}

impl<W: WatchdogPort> Deref for WatchdogGuard<'_, W> {
    type Target = W;

    fn deref(&self) -> &W {
        self.inner
    }
}

impl<W: WatchdogPort> DerefMut for WatchdogGuard<'_, W> {
    fn deref_mut(&mut self) -> &mut W {
        self.inner
    }
}

impl<W: WatchdogPort> Drop for WatchdogGuard<'_, W> {
    fn drop(&mut self) {
        self.inner.feed();
    }
}
