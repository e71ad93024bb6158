/*
 * allocator.rs
 *
 * Overflow-checked multiplying allocation, plus the plain malloc/calloc/
 * realloc/free/strdup pass-throughs.
 *
 * The only real logic here is the size product. Factors are applied left
 * to right and checked at every step: for a * b * c, an overflow in a * b
 * is an error even when c == 0. A leading zero factor short-circuits to
 * "nothing to allocate", which is not an error.
 *
 * Raw memory comes from a RawAlloc. LibcAlloc (malloc/free) is the
 * default; tests plug in counting and failing allocators.
 */

use core::ffi::CStr;
use core::fmt;
use core::mem::{ManuallyDrop, MaybeUninit};
use core::ptr::NonNull;

use crate::error::{ErrorCategory, PortError, Result};
use crate::port::Port;
use crate::report::Reporter;

/// Ordered list of 2 or 3 byte-count factors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SizeRequest {
    factors: [usize; 3],
    arity: usize,
}

impl SizeRequest {
    #[must_use]
    pub const fn pair(a: usize, b: usize) -> Self {
        Self {
            factors: [a, b, 1],
            arity: 2,
        }
    }

    #[must_use]
    pub const fn triple(a: usize, b: usize, c: usize) -> Self {
        Self {
            factors: [a, b, c],
            arity: 3,
        }
    }

    #[must_use]
    pub fn factors(&self) -> &[usize] {
        &self.factors[..self.arity]
    }

    /// Product of the factors, `None` on overflow. Never reports.
    #[must_use]
    pub fn product(&self) -> Option<usize> {
        size_product(self.factors())
    }
}

impl fmt::Display for SizeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, factor) in self.factors().iter().enumerate() {
            if i > 0 {
                f.write_str(" * ")?;
            }
            write!(f, "{factor}")?;
        }
        Ok(())
    }
}

/*
 * left-to-right product with a check after every step.
 * checked_mul is the "does res / factor give back the old value" test
 * without the division.
 */
fn size_product(factors: &[usize]) -> Option<usize> {
    let (&first, rest) = factors.split_first()?;
    if first == 0 {
        return Some(0);
    }

    let mut acc = first;
    for &factor in rest {
        acc = acc.checked_mul(factor)?;
    }
    Some(acc)
}

/// Source of raw, uninitialized memory.
///
/// # Safety
///
/// `allocate` must return either null or a pointer to at least `size`
/// writable bytes that stays valid until passed to `release` (or
/// `reallocate`) on an equivalent allocator. Clones must be able to
/// release each other's blocks.
pub unsafe trait RawAlloc: Clone {
    /// `size` is never zero.
    fn allocate(&self, size: usize) -> *mut u8;

    /// Zeroed block of `count * size` bytes, null on overflow or failure.
    fn allocate_zeroed(&self, count: usize, size: usize) -> *mut u8 {
        let Some(total) = count.checked_mul(size).filter(|&n| n > 0) else {
            return core::ptr::null_mut();
        };
        let ptr = self.allocate(total);
        if !ptr.is_null() {
            // SAFETY: allocate returned total writable bytes
            unsafe { core::ptr::write_bytes(ptr, 0, total) };
        }
        ptr
    }

    /// Grow or shrink a block. Null means failure, and then the old block
    /// is still owned by the caller.
    ///
    /// # Safety
    ///
    /// `ptr` must come from this allocator and hold at least `old_size`
    /// bytes. `new_size` is never zero.
    unsafe fn reallocate(&self, ptr: *mut u8, old_size: usize, new_size: usize) -> *mut u8 {
        let fresh = self.allocate(new_size);
        if !fresh.is_null() {
            // SAFETY: both blocks are valid for min(old, new) bytes and
            // are distinct allocations.
            unsafe {
                core::ptr::copy_nonoverlapping(ptr, fresh, old_size.min(new_size));
                self.release(ptr);
            }
        }
        fresh
    }

    /// # Safety
    ///
    /// `ptr` must come from this allocator and not be used afterwards.
    unsafe fn release(&self, ptr: *mut u8);
}

/// Thin wrapper around malloc/calloc/realloc/free.
#[derive(Debug, Clone, Copy, Default)]
pub struct LibcAlloc;

// SAFETY: malloc/calloc/realloc return null or a block of the requested
// size that stays valid until free. Any LibcAlloc can free any other's block.
unsafe impl RawAlloc for LibcAlloc {
    #[inline]
    fn allocate(&self, size: usize) -> *mut u8 {
        // SAFETY: malloc is safe to call with any size
        unsafe { libc::malloc(size).cast() }
    }

    #[inline]
    fn allocate_zeroed(&self, count: usize, size: usize) -> *mut u8 {
        if count == 0 || size == 0 {
            return core::ptr::null_mut();
        }
        // SAFETY: calloc checks count * size for overflow itself
        unsafe { libc::calloc(count, size).cast() }
    }

    #[inline]
    unsafe fn reallocate(&self, ptr: *mut u8, _old_size: usize, new_size: usize) -> *mut u8 {
        // SAFETY: caller guarantees ptr came from malloc/calloc/realloc
        unsafe { libc::realloc(ptr.cast(), new_size).cast() }
    }

    #[inline]
    unsafe fn release(&self, ptr: *mut u8) {
        // SAFETY: caller guarantees ptr came from malloc/calloc/realloc
        unsafe { libc::free(ptr.cast()) }
    }
}

/// Owned block of `len > 0` bytes. Contents start uninitialized unless
/// the block came from `calloc`.
///
/// Dropping it hands the memory back to its allocator.
pub struct RawBuffer<A: RawAlloc = LibcAlloc> {
    ptr: NonNull<u8>,
    len: usize,
    alloc: A,
}

// SAFETY: the buffer uniquely owns its block; moving it between threads
// moves that ownership. Shared access only hands out &[..] views.
unsafe impl<A: RawAlloc + Send> Send for RawBuffer<A> {}
// SAFETY: see above, &RawBuffer exposes no interior mutability
unsafe impl<A: RawAlloc + Sync> Sync for RawBuffer<A> {}

impl<A: RawAlloc> RawBuffer<A> {
    /// # Safety
    ///
    /// `ptr` must be a live block of at least `len` bytes from `alloc`,
    /// owned by nobody else.
    #[must_use]
    pub unsafe fn from_raw_parts(ptr: NonNull<u8>, len: usize, alloc: A) -> Self {
        Self { ptr, len, alloc }
    }

    fn adopt(ptr: *mut u8, len: usize, alloc: A) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, len, alloc })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    #[must_use]
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    pub fn as_uninit_mut(&mut self) -> &mut [MaybeUninit<u8>] {
        // SAFETY: ptr is valid for len bytes and uniquely borrowed;
        // MaybeUninit<u8> has no validity requirement.
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr().cast(), self.len) }
    }

    /// Initialize every byte to `byte` and return the now-readable slice.
    pub fn fill(&mut self, byte: u8) -> &mut [u8] {
        // SAFETY: ptr is valid for len writable bytes
        unsafe {
            core::ptr::write_bytes(self.ptr.as_ptr(), byte, self.len);
            core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len)
        }
    }

    /// # Safety
    ///
    /// Every byte must have been written (or the block came from `calloc`).
    #[must_use]
    pub unsafe fn assume_init(&self) -> &[u8] {
        // SAFETY: caller guarantees initialization; ptr is valid for len bytes
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// # Safety
    ///
    /// Same as [`assume_init`](Self::assume_init).
    pub unsafe fn assume_init_mut(&mut self) -> &mut [u8] {
        // SAFETY: caller guarantees initialization; ptr is valid for len bytes
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }

    /// Give up ownership. The caller must release the block through the
    /// same allocator (`free` for `LibcAlloc`).
    #[must_use]
    pub fn into_raw(self) -> (NonNull<u8>, usize) {
        let this = ManuallyDrop::new(self);
        (this.ptr, this.len)
    }

    /// realloc. `new_size == 0` frees the block and yields `Ok(None)`.
    /// On failure the untouched original comes back in `Err`.
    pub fn resize(self, new_size: usize) -> core::result::Result<Option<Self>, Self> {
        if new_size == 0 {
            drop(self);
            return Ok(None);
        }

        let this = ManuallyDrop::new(self);
        // SAFETY: this.ptr came from this.alloc with this.len bytes, and
        // ManuallyDrop keeps us from freeing it twice if realloc moves it.
        let fresh = unsafe {
            this.alloc
                .reallocate(this.ptr.as_ptr(), this.len, new_size)
        };

        // SAFETY: reading the allocator out of a ManuallyDrop we never drop
        let alloc = unsafe { core::ptr::read(&this.alloc) };
        match NonNull::new(fresh) {
            Some(ptr) => Ok(Some(Self {
                ptr,
                len: new_size,
                alloc,
            })),
            None => Err(Self {
                ptr: this.ptr,
                len: this.len,
                alloc,
            }),
        }
    }
}

impl<A: RawAlloc> Drop for RawBuffer<A> {
    fn drop(&mut self) {
        // SAFETY: we own the block and it came from self.alloc
        unsafe { self.alloc.release(self.ptr.as_ptr()) }
    }
}

impl<A: RawAlloc> fmt::Debug for RawBuffer<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawBuffer")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}

impl<R: Reporter, A: RawAlloc> Port<R, A> {
    /// `a * b`, or an overflow error (reported once).
    pub fn checked_mul2(&self, a: usize, b: usize) -> Result<usize> {
        self.checked_mul(SizeRequest::pair(a, b))
    }

    /// `a * b * c`, checked after each step.
    pub fn checked_mul3(&self, a: usize, b: usize, c: usize) -> Result<usize> {
        self.checked_mul(SizeRequest::triple(a, b, c))
    }

    pub fn checked_mul(&self, request: SizeRequest) -> Result<usize> {
        match request.product() {
            Some(size) => Ok(size),
            None => {
                self.sink().fail(
                    ErrorCategory::OutOfMemory,
                    format_args!("Multiplication overflow : {request}"),
                );
                Err(PortError::Overflow(request))
            }
        }
    }

    /// Allocate `a * b` bytes.
    ///
    /// `Ok(None)` when the product is zero: nothing to allocate, nothing
    /// reported. Overflow and allocator failure are reported once each
    /// and come back as errors.
    pub fn malloc2(&self, a: usize, b: usize) -> Result<Option<RawBuffer<A>>> {
        self.checked_alloc("malloc2", SizeRequest::pair(a, b))
    }

    /// Allocate `a * b * c` bytes. Same rules as [`malloc2`](Self::malloc2).
    pub fn malloc3(&self, a: usize, b: usize, c: usize) -> Result<Option<RawBuffer<A>>> {
        self.checked_alloc("malloc3", SizeRequest::triple(a, b, c))
    }

    fn checked_alloc(
        &self,
        name: &'static str,
        request: SizeRequest,
    ) -> Result<Option<RawBuffer<A>>> {
        /* overflow already reported by checked_mul */
        let size = self.checked_mul(request)?;
        if size == 0 {
            return Ok(None);
        }

        let ptr = self.alloc_raw(size);
        self.sink()
            .trace(format_args!("{name}({request}) = {ptr:p}"));

        match RawBuffer::adopt(ptr, size, self.allocator().clone()) {
            Some(buf) => Ok(Some(buf)),
            None => {
                self.sink().fail(
                    ErrorCategory::OutOfMemory,
                    format_args!("{name}(): Out of memory allocating {size} bytes."),
                );
                Err(PortError::OutOfMemory(size))
            }
        }
    }

    fn alloc_raw(&self, size: usize) -> *mut u8 {
        self.allocator().allocate(size)
    }

    /// Plain malloc. `None` for size 0 or when the allocator fails.
    pub fn malloc(&self, size: usize) -> Option<RawBuffer<A>> {
        if size == 0 {
            return None;
        }
        RawBuffer::adopt(self.alloc_raw(size), size, self.allocator().clone())
    }

    /// Plain calloc: zeroed, so `assume_init` is sound on the result.
    pub fn calloc(&self, count: usize, size: usize) -> Option<RawBuffer<A>> {
        let total = count.checked_mul(size).filter(|&n| n > 0)?;
        let ptr = self.allocator().allocate_zeroed(count, size);
        RawBuffer::adopt(ptr, total, self.allocator().clone())
    }

    /// Release a buffer. `None` is fine.
    pub fn free(&self, buffer: Option<RawBuffer<A>>) {
        if let Some(buf) = buffer {
            self.sink().trace(format_args!("free({:p})", buf.as_ptr()));
            drop(buf);
        }
    }

    /// Copy a C string, terminator included, into a fresh block.
    pub fn strdup(&self, s: &CStr) -> Option<RawBuffer<A>> {
        let bytes = s.to_bytes_with_nul();
        let mut buf = self.malloc(bytes.len())?;
        // SAFETY: buf holds bytes.len() writable bytes, distinct from s
        unsafe {
            core::ptr::copy_nonoverlapping(bytes.as_ptr(), buf.as_mut_ptr(), bytes.len());
        }
        Some(buf)
    }
}

/* -------------------------------------------------------------------------- */
/*                              kani proofs                                   */
/* -------------------------------------------------------------------------- */

#[cfg(kani)]
mod kani_proofs {
    use super::*;

    /*
     * pair product either matches the wide product or the wide product
     * doesn't fit usize. no silent wrap.
     */
    #[kani::proof]
    fn verify_pair_product_never_wraps() {
        let a: usize = kani::any();
        let b: usize = kani::any();
        let wide = (a as u128) * (b as u128);

        match SizeRequest::pair(a, b).product() {
            Some(p) => kani::assert(p as u128 == wide, "product must be exact"),
            None => kani::assert(wide > usize::MAX as u128, "overflow only when it doesn't fit"),
        }
    }

    /*
     * a * b overflowing is caught before c is looked at, even when c == 0.
     */
    #[kani::proof]
    fn verify_triple_short_circuits_on_first_pair() {
        let a: usize = kani::any();
        let b: usize = kani::any();
        let c: usize = kani::any();
        kani::assume(a != 0);
        kani::assume(a.checked_mul(b).is_none());

        kani::assert(
            SizeRequest::triple(a, b, c).product().is_none(),
            "first-pair overflow must be reported regardless of c",
        );
    }

    #[kani::proof]
    fn verify_leading_zero_is_zero() {
        let b: usize = kani::any();
        let c: usize = kani::any();
        kani::assert(SizeRequest::pair(0, b).product() == Some(0), "0 * b == 0");
        kani::assert(SizeRequest::triple(0, b, c).product() == Some(0), "0 * b * c == 0");
    }
}
