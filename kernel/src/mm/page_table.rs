//! Sv32 two-level paging: `map_page`, the one operation this layer exposes.

use bitflags::bitflags;

use crate::error::FatalError;
use crate::mm::frame_allocator::{self, PAGE_SIZE};

bitflags! {
    /// Bits 7:0 of an Sv32 PTE. `V` is added by `map_page` itself; callers
    /// pass the subset of {R,W,X,U,G,A,D} the mapping needs.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PteFlags: u32 {
        const V = 1 << 0;
        const R = 1 << 1;
        const W = 1 << 2;
        const X = 1 << 3;
        const U = 1 << 4;
        const G = 1 << 5;
        const A = 1 << 6;
        const D = 1 << 7;
    }
}

pub const KERNEL_RWX: PteFlags = PteFlags::R.union(PteFlags::W).union(PteFlags::X);
pub const USER_RWX: PteFlags = PteFlags::U
    .union(PteFlags::R)
    .union(PteFlags::W)
    .union(PteFlags::X);
pub const DEVICE_RW: PteFlags = PteFlags::R.union(PteFlags::W);

/// A single Sv32 page-table entry: bits 31:10 physical page number, bits
/// 9:8 reserved (left zero), bits 7:0 flags.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry(u32);

impl PageTableEntry {
    const fn empty() -> Self {
        PageTableEntry(0)
    }

    fn is_valid(self) -> bool {
        self.0 & PteFlags::V.bits() != 0
    }

    /// Physical address of the frame (or next-level table) this entry
    /// names.
    fn frame_addr(self) -> usize {
        ((self.0 >> 10) << 12) as usize
    }

    fn set(&mut self, frame_paddr: usize, flags: PteFlags) {
        debug_assert_eq!(frame_paddr % PAGE_SIZE, 0);
        self.0 = (((frame_paddr >> 12) << 10) as u32) | (flags | PteFlags::V).bits();
    }
}

/// One level of the Sv32 table: 1024 4-byte entries, page-aligned.
#[repr(C, align(4096))]
pub struct PageTable {
    entries: [PageTableEntry; 1024],
}

impl PageTable {
    #[cfg(target_arch = "riscv32")]
    pub fn blank() -> &'static mut PageTable {
        let paddr = frame_allocator::alloc_frames(1);
        // Safety: `paddr` names a freshly zeroed, page-aligned frame the
        // allocator just handed out exclusively to us.
        unsafe { &mut *(paddr as *mut PageTable) }
    }
}

fn vpn1(vaddr: usize) -> usize {
    (vaddr >> 22) & 0x3ff
}

fn vpn0(vaddr: usize) -> usize {
    (vaddr >> 12) & 0x3ff
}

/// Maps one 4 KiB page. `vaddr` and `paddr` must both be 4 KiB aligned;
/// `flags` is some subset of {R,W,X,U,G,A,D} (`V` is added here). Allocates
/// a level-0 table on demand the first time `vaddr`'s VPN1 slot is touched.
/// Aborts (fatal-abort, §7) on misaligned input.
#[cfg(target_arch = "riscv32")]
pub fn map_page(root: &mut PageTable, vaddr: usize, paddr: usize, flags: PteFlags) {
    if vaddr % PAGE_SIZE != 0 || paddr % PAGE_SIZE != 0 {
        crate::abort(FatalError::UnalignedMapping { vaddr, paddr });
    }

    let l1_index = vpn1(vaddr);
    if !root.entries[l1_index].is_valid() {
        let child = frame_allocator::alloc_frames(1);
        root.entries[l1_index].set(child, PteFlags::empty());
    }

    let l0_table = root.entries[l1_index].frame_addr() as *mut PageTable;
    // Safety: the entry above was just created (or already pointed at a
    // page-aligned frame this kernel allocated) and is exclusively owned by
    // this process's address space.
    let l0_table = unsafe { &mut *l0_table };
    l0_table.entries[vpn0(vaddr)].set(paddr, flags);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vpn_split_matches_sv32_layout() {
        let vaddr = 0x0120_3000usize;
        assert_eq!(vpn1(vaddr), (vaddr >> 22) & 0x3ff);
        assert_eq!(vpn0(vaddr), (vaddr >> 12) & 0x3ff);
        // Reassembling the two indices plus the page offset must reproduce
        // the original address.
        let rebuilt = (vpn1(vaddr) << 22) | (vpn0(vaddr) << 12) | (vaddr & 0xfff);
        assert_eq!(rebuilt, vaddr);
    }

    #[test]
    fn pte_round_trips_frame_and_flags() {
        let mut pte = PageTableEntry::empty();
        assert!(!pte.is_valid());
        pte.set(0x8010_3000, PteFlags::R | PteFlags::W);
        assert!(pte.is_valid());
        assert_eq!(pte.frame_addr(), 0x8010_3000);
    }
}
