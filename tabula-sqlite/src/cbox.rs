use std::ops::{Deref, DerefMut};

pub(crate) trait NullCheck {
    fn is_null(&self) -> bool;
}

impl<T> NullCheck for *const T {
    fn is_null(&self) -> bool {
        (*self as *const T).is_null()
    }
}

impl<T> NullCheck for *mut T {
    fn is_null(&self) -> bool {
        (*self as *const T).is_null()
    }
}

/// Owns a pointer handed out by the C library, `dealloc` runs on drop unless it is null.
#[derive(Debug)]
pub(crate) struct CBox<T: NullCheck> {
    pub(crate) ptr: T,
    dealloc: fn(T),
}

impl<T: NullCheck> CBox<T> {
    pub fn new(ptr: T, dealloc: fn(T)) -> Self {
        Self { ptr, dealloc }
    }
}

impl<T: NullCheck + Copy> CBox<T> {
    /// Non owning copy, used to move the handle into blocking tasks.
    pub fn borrowed(&self) -> Self {
        Self::new(self.ptr, |_| {})
    }
}

impl<T: NullCheck> Drop for CBox<T> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe {
                (self.dealloc)(std::ptr::read(&self.ptr as *const T));
            }
        }
    }
}

impl<T: NullCheck> Deref for CBox<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.ptr
    }
}

impl<T: NullCheck> DerefMut for CBox<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ptr
    }
}

unsafe impl<T: NullCheck> Send for CBox<T> {}
unsafe impl<T: NullCheck> Sync for CBox<T> {}

#[cfg(test)]
mod tests {
    use crate::cbox::CBox;
    use std::{
        ptr,
        sync::atomic::{AtomicBool, Ordering},
    };

    static DESTROYED: AtomicBool = AtomicBool::new(false);

    #[test]
    fn cbox_raw_pointer() {
        let v = 123;
        let ptr: *const i32 = &v;
        {
            let ptr = CBox::new(ptr::null::<i32>(), |_| DESTROYED.store(true, Ordering::SeqCst));
            assert!(ptr.is_null());
        }
        assert!(!DESTROYED.load(Ordering::SeqCst));
        {
            let ptr = CBox::new(ptr, |_| DESTROYED.store(true, Ordering::SeqCst));
            let copy = ptr.borrowed();
            drop(copy);
            assert!(!DESTROYED.load(Ordering::SeqCst));
            assert_eq!(unsafe { **ptr }, 123);
        }
        assert!(DESTROYED.load(Ordering::SeqCst));
    }
}
