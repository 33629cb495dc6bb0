use std::cell::RefCell;
use std::rc::Rc;

use super::RawId;

/// A backend object whose owner has gone away.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Release {
    Buffer(RawId),
    Texture(RawId),
    Program(RawId),
}

/// Deferred-deletion queue shared between a context and the resources it
/// created.
///
/// Resources push their name here on drop; the context deletes queued names
/// before its next checked call. Drop never touches the backend, so owners
/// do not need a context reference to be dropped.
#[derive(Debug, Clone, Default)]
pub(crate) struct ReleaseQueue(Rc<RefCell<Vec<Release>>>);

impl ReleaseQueue {
    #[inline]
    pub(crate) fn push(&self, release: Release) {
        self.0.borrow_mut().push(release);
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.0.borrow().is_empty()
    }

    #[inline]
    pub(crate) fn take(&self) -> Vec<Release> {
        std::mem::take(&mut *self.0.borrow_mut())
    }

    #[inline]
    pub(crate) fn is_shared_with(&self, other: &ReleaseQueue) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
