//! Address space layout and the Sv32 plumbing (frame allocator, page
//! tables) underneath it.

pub mod frame_allocator;
pub mod page_table;

#[cfg(target_arch = "riscv32")]
use crate::arch::riscv32::csr;
#[cfg(target_arch = "riscv32")]
use page_table::{DEVICE_RW, KERNEL_RWX, USER_RWX};
use page_table::PageTable;

/// First virtual address of a user image, matching the original kernel's
/// fixed load address.
pub const USER_BASE: usize = 0x0100_0000;

/// Physical base of the virtio-blk MMIO window (§6).
pub const VIRTIO_BLK_PADDR: usize = 0x1000_1000;
pub const VIRTIO_BLK_SIZE: usize = 0x1000;

#[cfg(target_arch = "riscv32")]
extern "C" {
    static __kernel_base: u8;
    static __free_ram_end: u8;
}

#[cfg(target_arch = "riscv32")]
fn kernel_base() -> usize {
    unsafe { &__kernel_base as *const u8 as usize }
}

#[cfg(target_arch = "riscv32")]
fn free_ram_end() -> usize {
    unsafe { &__free_ram_end as *const u8 as usize }
}

/// Builds the `satp` value for Sv32 mode given a root table's physical
/// address (must be page-aligned, so its low 12 bits are free for the mode
/// field and ASID, both of which this kernel leaves at their default of 0
/// beyond the mode bit).
#[cfg(target_arch = "riscv32")]
pub fn satp_for_root(root: *const PageTable) -> u32 {
    csr::SATP_MODE_SV32 | ((root as u32) >> 12)
}

/// Identity-maps the kernel image, RAM pool, and virtio-blk MMIO window
/// into `root`. Every process's address space needs this, since the
/// kernel's own code and the driver must remain reachable across a
/// `satp` switch.
#[cfg(target_arch = "riscv32")]
pub fn map_kernel_identity(root: &mut PageTable) {
    let mut paddr = kernel_base();
    while paddr < free_ram_end() {
        page_table::map_page(root, paddr, paddr, KERNEL_RWX);
        paddr += frame_allocator::PAGE_SIZE;
    }

    page_table::map_page(root, VIRTIO_BLK_PADDR, VIRTIO_BLK_PADDR, DEVICE_RW);
}

/// Maps `image` (`image.len()` bytes, rounded up to whole pages) into
/// `root` starting at `USER_BASE`, copying the image data one page at a
/// time into freshly allocated frames.
#[cfg(target_arch = "riscv32")]
pub fn map_user_image(root: &mut PageTable, image: &[u8]) {
    let mut offset = 0usize;
    while offset < image.len() {
        let frame = frame_allocator::alloc_frames(1);
        let remaining = image.len() - offset;
        let n = remaining.min(frame_allocator::PAGE_SIZE);
        // Safety: `frame` is a freshly allocated, exclusively owned page.
        unsafe {
            core::ptr::copy_nonoverlapping(image.as_ptr().add(offset), frame as *mut u8, n);
        }
        page_table::map_page(root, USER_BASE + offset, frame, USER_RWX);
        offset += frame_allocator::PAGE_SIZE;
    }
}
