//! Firmware-agnostic DMA page pool.
//!
//! Hands out zeroed, page-aligned 4 KiB pages that a device may DMA into.
//! The NIC driver backs its descriptor rings and packet buffers with these
//! pages; nothing is ever returned during normal operation, but single pages
//! can be released for tests and teardown paths.
//!
//! # Memory Sources
//!
//! 1. **Static pool**: compile-time storage inside the image (always works)
//! 2. **External**: caller provides an identity-mapped region (e.g. reserved
//!    by the platform layer)
//!
//! Both sources assume identity mapping: the physical address handed to the
//! device equals the CPU address used by the driver.
//!
//! # Usage
//!
//! ```ignore
//! use dma_pool::DmaPool;
//!
//! DmaPool::init_static();
//! let page = DmaPool::alloc_zeroed_page()?;
//! device.write_base(page.paddr() as u64);
//! ```

#![no_std]

use core::ptr::NonNull;

/// Page size (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Default static pool size (2MB).
pub const DEFAULT_POOL_SIZE: usize = 2 * 1024 * 1024;

/// Upper bound on pages tracked by one pool (16MB).
pub const MAX_POOL_PAGES: usize = 4096;

const BITMAP_WORDS: usize = MAX_POOL_PAGES / 64;

// ============================================================================
// Utility functions
// ============================================================================

/// Align a value up to the given alignment.
#[inline]
pub const fn align_up(val: usize, align: usize) -> usize {
    (val + align - 1) & !(align - 1)
}

/// Align a value down to the given alignment.
#[inline]
pub const fn align_down(val: usize, align: usize) -> usize {
    val & !(align - 1)
}

/// Convert pages to bytes.
#[inline]
pub const fn pages_to_bytes(pages: usize) -> usize {
    pages * PAGE_SIZE
}

/// Convert bytes to pages (rounded up).
#[inline]
pub const fn bytes_to_pages(bytes: usize) -> usize {
    align_up(bytes, PAGE_SIZE) / PAGE_SIZE
}

// ============================================================================
// Memory region
// ============================================================================

/// An identity-mapped memory region suitable for DMA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryRegion {
    /// Base address (physical = virtual in identity mapping).
    pub base: usize,
    /// Size in bytes.
    pub size: usize,
}

impl MemoryRegion {
    /// Create a new memory region.
    pub const fn new(base: usize, size: usize) -> Self {
        Self { base, size }
    }

    /// Check if region holds at least one whole aligned page.
    pub fn is_usable(&self) -> bool {
        self.base != 0 && self.aligned().size >= PAGE_SIZE
    }

    /// Get the page-aligned sub-region.
    pub fn aligned(&self) -> Self {
        let aligned_base = align_up(self.base, PAGE_SIZE);
        let adjustment = aligned_base - self.base;
        let aligned_size = align_down(self.size.saturating_sub(adjustment), PAGE_SIZE);
        Self {
            base: aligned_base,
            size: aligned_size,
        }
    }
}

// ============================================================================
// Error types
// ============================================================================

/// DMA pool errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaError {
    /// Pool not initialized.
    NotInitialized,
    /// Every page in the pool is in use.
    OutOfMemory,
    /// Pool already initialized.
    AlreadyInitialized,
    /// Region is unaligned, null, or smaller than a page.
    InvalidRegion,
    /// Address was not handed out by this pool.
    NotAllocated,
}

impl core::fmt::Display for DmaError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotInitialized => write!(f, "DMA pool not initialized"),
            Self::OutOfMemory => write!(f, "DMA pool exhausted"),
            Self::AlreadyInitialized => write!(f, "DMA pool already initialized"),
            Self::InvalidRegion => write!(f, "invalid DMA region"),
            Self::NotAllocated => write!(f, "page not allocated from this pool"),
        }
    }
}

/// Result type for DMA operations.
pub type Result<T> = core::result::Result<T, DmaError>;

// ============================================================================
// Physical page handle
// ============================================================================

/// One zeroed 4 KiB page owned by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysPage {
    paddr: usize,
    vaddr: NonNull<u8>,
}

impl PhysPage {
    /// Wrap an already-mapped page.
    ///
    /// # Safety
    /// `vaddr` must map `paddr`, be page-aligned, and stay valid and
    /// exclusively owned by the holder for the rest of the program.
    pub const unsafe fn from_raw(paddr: usize, vaddr: NonNull<u8>) -> Self {
        Self { paddr, vaddr }
    }

    /// Device-visible (physical) address.
    #[inline]
    pub fn paddr(&self) -> usize {
        self.paddr
    }

    /// CPU pointer to the page.
    #[inline]
    pub fn vaddr(&self) -> NonNull<u8> {
        self.vaddr
    }
}

unsafe impl Send for PhysPage {}

// ============================================================================
// Page pool
// ============================================================================

/// Bitmap page allocator over one identity-mapped region.
pub struct PagePool {
    region: MemoryRegion,
    pages: usize,
    used: [u64; BITMAP_WORDS],
    in_use: usize,
    next_hint: usize,
}

impl PagePool {
    /// A pool with no backing memory. Every allocation fails.
    pub const fn empty() -> Self {
        Self {
            region: MemoryRegion::new(0, 0),
            pages: 0,
            used: [0; BITMAP_WORDS],
            in_use: 0,
            next_hint: 0,
        }
    }

    /// Build a pool over `region`.
    ///
    /// The region is trimmed to whole pages; anything past
    /// [`MAX_POOL_PAGES`] is ignored.
    ///
    /// # Safety
    ///
    /// - The region must be identity-mapped (phys == virt).
    /// - The region must not be used by anything else.
    /// - The region must remain valid for the lifetime of the program.
    pub unsafe fn from_region(region: MemoryRegion) -> Result<Self> {
        if !region.is_usable() {
            return Err(DmaError::InvalidRegion);
        }
        let aligned = region.aligned();
        let pages = (aligned.size / PAGE_SIZE).min(MAX_POOL_PAGES);
        Ok(Self {
            region: aligned,
            pages,
            used: [0; BITMAP_WORDS],
            in_use: 0,
            next_hint: 0,
        })
    }

    /// Allocate one page and zero it.
    pub fn alloc_zeroed_page(&mut self) -> Result<PhysPage> {
        let index = self.find_free().ok_or(DmaError::OutOfMemory)?;
        self.used[index / 64] |= 1u64 << (index % 64);
        self.in_use += 1;
        self.next_hint = (index + 1) % self.pages;

        let paddr = self.region.base + pages_to_bytes(index);
        let vaddr_ptr = paddr as *mut u8;

        // SAFETY: the page lies inside the region handed to `from_region`.
        unsafe {
            core::ptr::write_bytes(vaddr_ptr, 0, PAGE_SIZE);
        }

        let vaddr = NonNull::new(vaddr_ptr).ok_or(DmaError::InvalidRegion)?;
        Ok(PhysPage { paddr, vaddr })
    }

    /// Return a page to the pool.
    ///
    /// # Safety
    ///
    /// Neither the CPU nor any device may touch the page afterwards.
    pub unsafe fn free_page(&mut self, page: PhysPage) -> Result<()> {
        let index = self.index_of(page.paddr).ok_or(DmaError::NotAllocated)?;
        let bit = 1u64 << (index % 64);
        if self.used[index / 64] & bit == 0 {
            return Err(DmaError::NotAllocated);
        }
        self.used[index / 64] &= !bit;
        self.in_use -= 1;
        Ok(())
    }

    /// Total pages managed by the pool.
    pub fn total_pages(&self) -> usize {
        self.pages
    }

    /// Pages still available.
    pub fn free_pages(&self) -> usize {
        self.pages - self.in_use
    }

    /// Backing region.
    pub fn region(&self) -> MemoryRegion {
        self.region
    }

    fn find_free(&self) -> Option<usize> {
        (0..self.pages)
            .map(|step| (self.next_hint + step) % self.pages)
            .find(|&index| self.used[index / 64] & (1u64 << (index % 64)) == 0)
    }

    fn index_of(&self, paddr: usize) -> Option<usize> {
        let end = self.region.base + pages_to_bytes(self.pages);
        if paddr < self.region.base || paddr >= end || paddr % PAGE_SIZE != 0 {
            return None;
        }
        Some((paddr - self.region.base) / PAGE_SIZE)
    }
}

impl Default for PagePool {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Global DMA Pool
// ============================================================================

/// Page-aligned static storage (fallback).
#[repr(C, align(4096))]
struct StaticStorage {
    data: [u8; DEFAULT_POOL_SIZE],
}

static mut STATIC_STORAGE: StaticStorage = StaticStorage {
    data: [0u8; DEFAULT_POOL_SIZE],
};

static POOL: spin::Mutex<Option<PagePool>> = spin::Mutex::new(None);

/// Global DMA page pool.
///
/// A singleton shared by every driver in the image. Initialize once at
/// startup, then allocate pages from anywhere.
pub struct DmaPool;

impl DmaPool {
    /// Initialize with the built-in static storage.
    ///
    /// Subsequent calls are no-ops.
    pub fn init_static() {
        let mut pool = POOL.lock();
        if pool.is_some() {
            return;
        }

        // SAFETY: the storage is only ever handed out through this pool and
        // the lock above serializes initialization.
        let base = unsafe { core::ptr::addr_of_mut!(STATIC_STORAGE.data) as usize };
        let region = MemoryRegion::new(base, DEFAULT_POOL_SIZE);
        *pool = unsafe { PagePool::from_region(region) }.ok();
    }

    /// Initialize with an externally-provided memory region.
    ///
    /// # Safety
    ///
    /// Same contract as [`PagePool::from_region`].
    pub unsafe fn init_external(base: usize, size: usize) -> Result<()> {
        let mut pool = POOL.lock();
        if pool.is_some() {
            return Err(DmaError::AlreadyInitialized);
        }
        *pool = Some(PagePool::from_region(MemoryRegion::new(base, size))?);
        Ok(())
    }

    /// Check if the pool is initialized.
    #[inline]
    pub fn is_initialized() -> bool {
        POOL.lock().is_some()
    }

    /// Allocate one zeroed page.
    pub fn alloc_zeroed_page() -> Result<PhysPage> {
        POOL.lock()
            .as_mut()
            .ok_or(DmaError::NotInitialized)?
            .alloc_zeroed_page()
    }

    /// Release one page.
    ///
    /// # Safety
    ///
    /// Same contract as [`PagePool::free_page`].
    pub unsafe fn free_page(page: PhysPage) -> Result<()> {
        POOL.lock()
            .as_mut()
            .ok_or(DmaError::NotInitialized)?
            .free_page(page)
    }

    /// Pages still available (0 before initialization).
    pub fn free_pages() -> usize {
        POOL.lock().as_ref().map_or(0, PagePool::free_pages)
    }
}

// ============================================================================
// Tests
// ============================================================================
