use {
    crate::{SegmentError, SlotId},
    base::*,
    libloading::Library,
    std::{
        alloc::{Layout, alloc_zeroed, dealloc},
        collections::BTreeMap,
        ffi::{OsStr, c_void},
        ptr::NonNull,
    },
};

/// Default tensor alignment of the TFLite runtime.
pub const DEFAULT_TENSOR_ALIGNMENT: usize = 64;

/// Source of memory that both the host and the accelerator can address.
pub trait SharedAllocator {
    fn name(&self) -> &str;

    /// Returns a zeroed block of at least `size` bytes aligned to `alignment`.
    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, SegmentError>;

    /// # Safety
    /// `ptr` must come from `allocate` on this allocator with the same `size`
    /// and `alignment`, and must not be freed twice.
    unsafe fn free(&self, ptr: NonNull<u8>, size: usize, alignment: usize);
}

/// Aligned heap memory, for hosts without a shared memory driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostAllocator;

impl HostAllocator {
    fn layout(size: usize, alignment: usize) -> Result<Layout, SegmentError> {
        Layout::from_size_align(size.max(1), alignment).map_err(|e| {
            SegmentError::Allocation(format!("invalid layout ({size} bytes, align {alignment}): {e}"))
        })
    }
}

impl SharedAllocator for HostAllocator {
    fn name(&self) -> &str {
        "host"
    }

    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, SegmentError> {
        let layout = Self::layout(size, alignment)?;
        // SAFETY: layout has a non-zero size.
        NonNull::new(unsafe { alloc_zeroed(layout) }).ok_or_else(|| {
            SegmentError::Allocation(format!("out of memory allocating {size} bytes"))
        })
    }

    unsafe fn free(&self, ptr: NonNull<u8>, size: usize, alignment: usize) {
        if let Ok(layout) = Self::layout(size, alignment) {
            unsafe { dealloc(ptr.as_ptr(), layout) };
        }
    }
}

type AllocSharedMemFn = unsafe extern "C" fn(i32, i32) -> *mut c_void;
type FreeSharedMemFn = unsafe extern "C" fn(*mut c_void);

/// TI TIDL shared memory, resolved from the TIDL runtime library.
pub struct TidlSharedAllocator {
    _library: Library,
    alloc_shared_mem: AllocSharedMemFn,
    free_shared_mem: FreeSharedMemFn,
}

impl TidlSharedAllocator {
    pub const DEFAULT_LIBRARY: &'static str = "libvx_tidl_rt.so";

    pub fn load(path: impl AsRef<OsStr>) -> Result<Self, SegmentError> {
        let path = path.as_ref();
        let library = unsafe { Library::new(path) }.map_err(|e| {
            SegmentError::Allocation(format!(
                "cannot open shared memory library {}: {}",
                path.to_string_lossy(),
                e
            ))
        })?;
        let alloc_shared_mem = load_symbol::<AllocSharedMemFn>(&library, b"TIDLRT_allocSharedMem\0")?;
        let free_shared_mem = load_symbol::<FreeSharedMemFn>(&library, b"TIDLRT_freeSharedMem\0")?;
        Ok(TidlSharedAllocator {
            _library: library,
            alloc_shared_mem,
            free_shared_mem,
        })
    }
}

fn load_symbol<T: Copy>(library: &Library, name: &'static [u8]) -> Result<T, SegmentError> {
    let symbol = unsafe { library.get::<T>(name) }.map_err(|e| {
        SegmentError::Allocation(format!(
            "cannot resolve {}: {}",
            String::from_utf8_lossy(&name[..name.len() - 1]),
            e
        ))
    })?;
    Ok(*symbol)
}

impl SharedAllocator for TidlSharedAllocator {
    fn name(&self) -> &str {
        "tidl"
    }

    fn allocate(&self, size: usize, alignment: usize) -> Result<NonNull<u8>, SegmentError> {
        let size_i32 = i32::try_from(size).map_err(|_| {
            SegmentError::Allocation(format!("{size} bytes exceeds the shared memory limit"))
        })?;
        let alignment_i32 = i32::try_from(alignment)
            .map_err(|_| SegmentError::Allocation(format!("alignment {alignment} is too large")))?;
        let ptr = unsafe { (self.alloc_shared_mem)(alignment_i32, size_i32) } as *mut u8;
        let ptr = NonNull::new(ptr).ok_or_else(|| {
            SegmentError::Allocation(format!("TIDLRT_allocSharedMem failed for {size} bytes"))
        })?;
        unsafe { std::ptr::write_bytes(ptr.as_ptr(), 0, size) };
        Ok(ptr)
    }

    unsafe fn free(&self, ptr: NonNull<u8>, _size: usize, _alignment: usize) {
        unsafe { (self.free_shared_mem)(ptr.as_ptr() as *mut c_void) };
    }
}

/// Memory handed to one tensor slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    ptr: NonNull<u8>,
    len: usize,
    alignment: usize,
}

impl Region {
    pub fn ptr(&self) -> NonNull<u8> {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn alignment(&self) -> usize {
        self.alignment
    }
}

/// Zero-copy tensor memory for one run, tracked per slot.
///
/// Every region acquired is returned to the allocator exactly once: by
/// [`release`](Self::release), [`release_all`](Self::release_all), or on drop.
pub struct TensorMemoryArena {
    allocator: Box<dyn SharedAllocator>,
    regions: BTreeMap<SlotId, Region>,
}

impl TensorMemoryArena {
    pub fn new(allocator: Box<dyn SharedAllocator>) -> Self {
        Self {
            allocator,
            regions: BTreeMap::new(),
        }
    }

    pub fn allocator_name(&self) -> &str {
        self.allocator.name()
    }

    pub fn acquire(
        &mut self,
        slot: SlotId,
        byte_size: usize,
        alignment: usize,
    ) -> Result<Region, SegmentError> {
        if self.regions.contains_key(&slot) {
            return Err(SegmentError::Allocation(format!("{slot} already holds a region")));
        }
        if !alignment.is_power_of_two() {
            return Err(SegmentError::Allocation(format!(
                "alignment {alignment} is not a power of two"
            )));
        }
        let ptr = self.allocator.allocate(byte_size, alignment)?;
        if (ptr.as_ptr() as usize) % alignment != 0 {
            unsafe { self.allocator.free(ptr, byte_size, alignment) };
            return Err(SegmentError::Allocation(format!(
                "{} returned memory not aligned to {alignment}",
                self.allocator.name()
            )));
        }
        let region = Region {
            ptr,
            len: byte_size,
            alignment,
        };
        self.regions.insert(slot, region);
        log_debug!("{}: {} bytes for {}", self.allocator.name(), byte_size, slot);
        Ok(region)
    }

    pub fn release(&mut self, slot: SlotId) -> Result<(), SegmentError> {
        let region = self.regions.remove(&slot).ok_or_else(|| SegmentError::State {
            operation: "release region",
            state: format!("{slot} holds no region"),
        })?;
        unsafe { self.allocator.free(region.ptr, region.len, region.alignment) };
        Ok(())
    }

    /// Releases every outstanding region, returning how many there were.
    pub fn release_all(&mut self) -> usize {
        let regions = std::mem::take(&mut self.regions);
        let count = regions.len();
        for region in regions.into_values() {
            unsafe { self.allocator.free(region.ptr, region.len, region.alignment) };
        }
        count
    }

    pub fn region(&self, slot: SlotId) -> Option<Region> {
        self.regions.get(&slot).copied()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.regions.values().map(|r| r.len).sum()
    }
}

impl Drop for TensorMemoryArena {
    fn drop(&mut self) {
        self.release_all();
    }
}
