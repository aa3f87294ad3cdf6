//! Monotonic bump allocator over `[__free_ram, __free_ram_end)`.
//!
//! Out of scope per SPEC_FULL.md §1 in the sense that its *design* isn't
//! part of the specified core — but the kernel cannot boot without it, so
//! it is carried here behind a `spin::Mutex`-guarded cursor, the teacher's
//! own idiom for this exact module. Everywhere else in this codebase
//! single-writer kernel state (the process table, the filesystem buffers)
//! is a plain `static mut` instead — a `Mutex` would add nothing there but
//! an unused lock word. There is no free operation; see §3 Lifecycles.

use spin::Mutex;

use crate::error::FatalError;

pub const PAGE_SIZE: usize = 4096;

#[cfg(target_arch = "riscv32")]
extern "C" {
    static __free_ram: u8;
    static __free_ram_end: u8;
}

static CURSOR: Mutex<Option<usize>> = Mutex::new(None);

#[cfg(target_arch = "riscv32")]
fn free_ram_end() -> usize {
    unsafe { &__free_ram_end as *const u8 as usize }
}

/// Returns the current cursor, advancing it by `n * PAGE_SIZE` and
/// zero-filling the returned region. Aborts (fatal-abort, §7) if the
/// advance would cross `__free_ram_end`.
#[cfg(target_arch = "riscv32")]
pub fn alloc_frames(n: u32) -> usize {
    let mut cursor = CURSOR.lock();
    let base = *cursor.get_or_insert_with(|| unsafe { &__free_ram as *const u8 as usize });

    let len = n as usize * PAGE_SIZE;
    let next = base + len;
    if next > free_ram_end() {
        crate::abort(FatalError::OutOfMemory { requested_pages: n });
    }
    *cursor = Some(next);

    // Safety: `[base, base + len)` lies inside `[__free_ram, __free_ram_end)`
    // by the check above and is otherwise unclaimed, since this is the only
    // writer of `CURSOR`.
    unsafe {
        core::ptr::write_bytes(base as *mut u8, 0, len);
    }
    base
}

#[cfg(test)]
mod tests {
    // `alloc_frames` touches `__free_ram`, which only exists in the linked
    // kernel image; its logic (cursor arithmetic, overflow detection) is
    // exercised indirectly through `map_page`'s unit tests instead of here.
}
