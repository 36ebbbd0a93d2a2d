//! Identity-stamped resource wrapper.
//!
//! wgpu handles compare by internal pointer, which is useless as a cache
//! key once a texture has been recreated at the same address. [`Tracked`]
//! stamps each wrapped resource with a process-unique id so bind groups
//! can be invalidated when the underlying view actually changed.

use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

fn next_id() -> u64 {
    NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed)
}

/// A resource paired with a unique id.
///
/// Cloning preserves the id: a clone refers to the same logical resource.
#[derive(Debug, Clone)]
pub struct Tracked<T> {
    inner: T,
    id: u64,
}

impl<T> Tracked<T> {
    /// Wraps a resource and assigns it a fresh id.
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            id: next_id(),
        }
    }

    /// The unique id, usable as a bind-group cache key.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Unwraps the inner resource.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Deref for Tracked<T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
