use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::cell::UnsafeCell;
use std::marker::PhantomData;
use std::ptr::NonNull;

use thiserror::Error;

/// Alignment of every sample buffer, enough for 4-wide vector loads.
pub const BUFFER_ALIGN: usize = 16;

#[derive(Debug, Error)]
#[error("failed to allocate {bytes} bytes for a render buffer")]
pub struct AllocError {
    pub bytes: usize,
}

struct AlignedStorage<T> {
    ptr: NonNull<T>,
    len: usize,
}

impl<T> AlignedStorage<T> {
    fn empty() -> Self {
        AlignedStorage {
            ptr: NonNull::dangling(),
            len: 0,
        }
    }

    fn allocate(len: usize) -> Result<Self, AllocError> {
        if len == 0 {
            return Ok(Self::empty());
        }
        let align = BUFFER_ALIGN.max(std::mem::align_of::<T>());
        let bytes = len * std::mem::size_of::<T>();
        let layout = Layout::from_size_align(bytes, align).map_err(|_| AllocError { bytes })?;
        // SAFETY: layout has non-zero size.
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw.cast::<T>()).ok_or(AllocError { bytes })?;
        Ok(AlignedStorage { ptr, len })
    }
}

impl<T> Drop for AlignedStorage<T> {
    fn drop(&mut self) {
        if self.len > 0 {
            let align = BUFFER_ALIGN.max(std::mem::align_of::<T>());
            let bytes = self.len * std::mem::size_of::<T>();
            let layout = Layout::from_size_align(bytes, align).unwrap();
            // SAFETY: allocated with the same layout in `allocate`.
            unsafe { dealloc(self.ptr.as_ptr().cast(), layout) };
        }
    }
}

/// Contiguous, 16-byte aligned `width × height × samples` storage.
///
/// Samples of one pixel are stored back to back. Two addressing schemes are
/// offered: [`RenderBuffer::sample_offset`] for the plain layout (AA off and
/// MSAA), and [`RenderBuffer::super_sample_offset`] for the tile-local
/// super-sample layout, where `(x, y)` are render-resolution coordinates and
/// the N×N sub-samples of an output pixel stay contiguous so the resolve
/// pass reads one run per pixel.
///
/// Workers write through [`BufferView`]s obtained from a shared reference;
/// each worker must stay inside its own strip of rows. The per-frame barrier
/// in the rendering context orders those writes against the main thread.
pub struct RenderBuffer<T> {
    storage: UnsafeCell<AlignedStorage<T>>,
    width: usize,
    height: usize,
    samples: usize,
}

// SAFETY: the raw storage is plain memory; view writers uphold strip
// disjointness, and the draw barrier sequences them against `&mut` access.
unsafe impl<T: Send> Send for RenderBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for RenderBuffer<T> {}

impl<T: Copy> RenderBuffer<T> {
    pub fn new() -> Self {
        RenderBuffer {
            storage: UnsafeCell::new(AlignedStorage::empty()),
            width: 0,
            height: 0,
            samples: 0,
        }
    }

    /// Reallocate to the given shape. On allocation failure the previous
    /// storage is kept untouched. The new contents are zeroed.
    pub fn resize(&mut self, width: usize, height: usize, samples: usize) -> Result<(), AllocError> {
        if self.width == width && self.height == height && self.samples == samples {
            return Ok(());
        }
        let storage = AlignedStorage::allocate(width * height * samples)?;
        *self.storage.get_mut() = storage;
        self.width = width;
        self.height = height;
        self.samples = samples;
        Ok(())
    }

    pub fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.width * self.height * self.samples
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline(always)]
    pub fn sample_offset(&self, x: usize, y: usize, i: usize) -> usize {
        (y * self.width + x) * self.samples + i
    }

    /// Offset of the render-resolution sample `(x, y)` for an `n × n`
    /// super-sampled buffer (`samples == n * n`).
    #[inline(always)]
    pub fn super_sample_offset(&self, x: usize, y: usize, n: usize) -> usize {
        (y / n * self.width + x / n) * self.samples + (y % n) * n + (x % n)
    }

    pub fn as_slice(&self) -> &[T] {
        // SAFETY: shared access; no views are being written concurrently
        // outside the draw barrier.
        unsafe {
            let storage = &*self.storage.get();
            std::slice::from_raw_parts(storage.ptr.as_ptr(), storage.len)
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [T] {
        let storage = self.storage.get_mut();
        // SAFETY: exclusive access through `&mut self`.
        unsafe { std::slice::from_raw_parts_mut(storage.ptr.as_ptr(), storage.len) }
    }

    /// A raw view workers use for strip-local writes during a frame.
    pub(crate) fn view(&self) -> BufferView<'_, T> {
        // SAFETY: pointer validity is tied to `&self` via the view lifetime.
        let storage = unsafe { &*self.storage.get() };
        BufferView {
            ptr: storage.ptr.as_ptr(),
            len: storage.len,
            width: self.width,
            height: self.height,
            samples: self.samples,
            _marker: PhantomData,
        }
    }
}

impl<T: Copy> Default for RenderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Unsynchronized window into a [`RenderBuffer`]. Every worker gets one per
/// frame and only touches offsets inside its assigned strip.
#[derive(Clone, Copy)]
pub(crate) struct BufferView<'a, T> {
    ptr: *mut T,
    len: usize,
    width: usize,
    height: usize,
    samples: usize,
    _marker: PhantomData<&'a RenderBuffer<T>>,
}

// SAFETY: see `RenderBuffer`; disjoint strips, barrier-ordered.
unsafe impl<'a, T: Send + Sync> Send for BufferView<'a, T> {}
unsafe impl<'a, T: Send + Sync> Sync for BufferView<'a, T> {}

impl<'a, T: Copy> BufferView<'a, T> {
    #[inline(always)]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.height
    }

    #[inline(always)]
    pub fn samples(&self) -> usize {
        self.samples
    }

    #[inline(always)]
    pub fn sample_offset(&self, x: usize, y: usize, i: usize) -> usize {
        (y * self.width + x) * self.samples + i
    }

    #[inline(always)]
    pub fn super_sample_offset(&self, x: usize, y: usize, n: usize) -> usize {
        (y / n * self.width + x / n) * self.samples + (y % n) * n + (x % n)
    }

    #[inline(always)]
    pub fn get(&self, offset: usize) -> T {
        debug_assert!(offset < self.len);
        // SAFETY: offset checked in debug; writers are strip-disjoint.
        unsafe { *self.ptr.add(offset) }
    }

    #[inline(always)]
    pub fn set(&self, offset: usize, value: T) {
        debug_assert!(offset < self.len);
        // SAFETY: as above.
        unsafe { *self.ptr.add(offset) = value };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_is_aligned_and_zeroed() {
        let mut buf = RenderBuffer::<f32>::new();
        buf.resize(7, 3, 1).unwrap();
        assert_eq!(buf.as_slice().len(), 21);
        assert!(buf.as_slice().iter().all(|&v| v == 0.0));
        assert_eq!(buf.as_slice().as_ptr() as usize % BUFFER_ALIGN, 0);
    }

    #[test]
    fn sample_offsets_are_pixel_local() {
        let mut buf = RenderBuffer::<u32>::new();
        buf.resize(4, 4, 4).unwrap();
        assert_eq!(buf.sample_offset(0, 0, 3), 3);
        assert_eq!(buf.sample_offset(1, 0, 0), 4);
        assert_eq!(buf.sample_offset(0, 1, 0), 16);
    }

    #[test]
    fn super_sample_offsets_keep_subsamples_contiguous() {
        let mut buf = RenderBuffer::<u32>::new();
        buf.resize(2, 2, 4).unwrap(); // 2x2 output pixels, 2x2 SSAA
        // the four render-resolution samples of output pixel (0, 0)
        let offsets: Vec<_> = [(0, 0), (1, 0), (0, 1), (1, 1)]
            .iter()
            .map(|&(x, y)| buf.super_sample_offset(x, y, 2))
            .collect();
        assert_eq!(offsets, vec![0, 1, 2, 3]);
        // first sample of output pixel (1, 0)
        assert_eq!(buf.super_sample_offset(2, 0, 2), 4);
    }

    #[test]
    fn resize_to_zero_is_empty() {
        let mut buf = RenderBuffer::<u32>::new();
        buf.resize(8, 8, 1).unwrap();
        buf.resize(0, 0, 1).unwrap();
        assert!(buf.is_empty());
    }
}
