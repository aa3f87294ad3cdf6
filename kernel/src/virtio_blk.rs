//! virtio-blk (legacy, version 1) MMIO driver: one shared virtqueue, one
//! outstanding request at a time (§4.6).

use bitflags::bitflags;

use crate::error::{FatalError, KernelResult, RequestError};
use crate::mm::frame_allocator::{self, PAGE_SIZE};
use crate::mm::VIRTIO_BLK_PADDR;

const REG_MAGIC: usize = 0x00;
const REG_VERSION: usize = 0x04;
const REG_DEVICE_ID: usize = 0x08;
const REG_QUEUE_SEL: usize = 0x30;
const REG_QUEUE_NUM: usize = 0x38;
const REG_QUEUE_ALIGN: usize = 0x3c;
const REG_QUEUE_PFN: usize = 0x40;
const REG_QUEUE_NOTIFY: usize = 0x50;
const REG_STATUS: usize = 0x70;
const REG_CONFIG: usize = 0x100;

const VIRTIO_MAGIC: u32 = 0x7472_6976; // "virt", little-endian
const VIRTIO_BLK_DEVICE_ID: u32 = 2;

const VIRTIO_BLK_T_IN: u32 = 0;
const VIRTIO_BLK_T_OUT: u32 = 1;

pub const SECTOR_SIZE: usize = 512;
const VIRTQ_ENTRY_NUM: usize = 16;

bitflags! {
    #[derive(Clone, Copy)]
    struct DeviceStatus: u32 {
        const ACKNOWLEDGE = 1;
        const DRIVER = 2;
        const DRIVER_OK = 4;
        const FEATURES_OK = 8;
    }
}

bitflags! {
    #[derive(Clone, Copy)]
    struct DescFlags: u16 {
        const NEXT = 1;
        const WRITE = 2;
    }
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct VirtqDesc {
    addr: u64,
    len: u32,
    flags: u16,
    next: u16,
}

#[repr(C)]
struct VirtqAvail {
    flags: u16,
    index: u16,
    ring: [u16; VIRTQ_ENTRY_NUM],
}

#[repr(C)]
#[derive(Clone, Copy, Default)]
struct VirtqUsedElem {
    id: u32,
    len: u32,
}

#[repr(C)]
struct VirtqUsed {
    flags: u16,
    index: u16,
    ring: [VirtqUsedElem; VIRTQ_ENTRY_NUM],
}

const DESC_AVAIL_SIZE: usize =
    core::mem::size_of::<VirtqDesc>() * VIRTQ_ENTRY_NUM + core::mem::size_of::<VirtqAvail>();

/// Legacy virtio layout: descriptor table and available ring share the
/// first page; the used ring starts at the next page boundary regardless
/// of what's written to the (here unused-by-this-device) QueueAlign
/// register — see §4.6.
#[repr(C, align(4096))]
struct Virtqueue {
    descs: [VirtqDesc; VIRTQ_ENTRY_NUM],
    avail: VirtqAvail,
    _pad: [u8; PAGE_SIZE - DESC_AVAIL_SIZE],
    used: VirtqUsed,
}

const _: () = assert!(core::mem::size_of::<Virtqueue>() == 2 * PAGE_SIZE);

/// The 3-descriptor chained request record shared with the device: header
/// (type, reserved, sector), 512-byte data buffer, and a single status
/// byte the device writes back.
#[repr(C)]
struct BlockRequest {
    req_type: u32,
    reserved: u32,
    sector: u64,
    data: [u8; SECTOR_SIZE],
    status: u8,
}

static mut QUEUE: *mut Virtqueue = core::ptr::null_mut();
static mut REQUEST: *mut BlockRequest = core::ptr::null_mut();
static mut CAPACITY_BYTES: u64 = 0;
static mut LAST_SEEN_USED: u16 = 0;

/// Safety: `offset` must name a register documented in §6 at its correct
/// width; callers in this module all pass `const` offsets.
unsafe fn mmio_write32(offset: usize, value: u32) {
    let ptr = (VIRTIO_BLK_PADDR + offset) as *mut u32;
    // Safety: MMIO register, must not be reordered or elided.
    unsafe { core::ptr::write_volatile(ptr, value) };
}

unsafe fn mmio_read32(offset: usize) -> u32 {
    let ptr = (VIRTIO_BLK_PADDR + offset) as *const u32;
    // Safety: MMIO register, must not be reordered or elided.
    unsafe { core::ptr::read_volatile(ptr) }
}

unsafe fn mmio_read64(offset: usize) -> u64 {
    let ptr = (VIRTIO_BLK_PADDR + offset) as *const u64;
    // Safety: MMIO register, must not be reordered or elided.
    unsafe { core::ptr::read_volatile(ptr) }
}

/// Probes, resets, and negotiates the device per §4.6, then allocates the
/// virtqueue (2 pages) and the request record (1 page). Aborts on any
/// magic/version/device-id mismatch.
pub fn init() {
    // Safety: MMIO accesses below all target the fixed, identity-mapped
    // virtio-blk window; this function runs once during boot before any
    // other code touches the device.
    unsafe {
        let magic = mmio_read32(REG_MAGIC);
        let version = mmio_read32(REG_VERSION);
        let device_id = mmio_read32(REG_DEVICE_ID);
        if magic != VIRTIO_MAGIC || version != 1 || device_id != VIRTIO_BLK_DEVICE_ID {
            crate::abort(FatalError::DriverSanity { magic, version, device_id });
        }

        mmio_write32(REG_STATUS, 0);
        let mut status = DeviceStatus::ACKNOWLEDGE;
        mmio_write32(REG_STATUS, status.bits());
        status |= DeviceStatus::DRIVER;
        mmio_write32(REG_STATUS, status.bits());
        status |= DeviceStatus::FEATURES_OK;
        mmio_write32(REG_STATUS, status.bits());

        let queue_paddr = frame_allocator::alloc_frames(2);
        QUEUE = queue_paddr as *mut Virtqueue;

        mmio_write32(REG_QUEUE_SEL, 0);
        mmio_write32(REG_QUEUE_NUM, VIRTQ_ENTRY_NUM as u32);
        mmio_write32(REG_QUEUE_ALIGN, 0);
        mmio_write32(REG_QUEUE_PFN, (queue_paddr / PAGE_SIZE) as u32);

        status |= DeviceStatus::DRIVER_OK;
        mmio_write32(REG_STATUS, status.bits());

        CAPACITY_BYTES = mmio_read64(REG_CONFIG) * SECTOR_SIZE as u64;

        let req_paddr = frame_allocator::alloc_frames(1);
        REQUEST = req_paddr as *mut BlockRequest;
    }

    log::info!("virtio block: capacity is {} bytes", capacity_bytes());
}

pub fn capacity_bytes() -> u64 {
    // Safety: set once by `init`, read-only afterward.
    unsafe { CAPACITY_BYTES }
}

/// Performs one synchronous, single-outstanding block request (§4.6).
/// `buf` must be exactly `SECTOR_SIZE` bytes; on a read it is filled from
/// the device, on a write it is copied to the device first.
pub fn read_write_disk(buf: &mut [u8], sector: u64, is_write: bool) -> KernelResult<()> {
    debug_assert_eq!(buf.len(), SECTOR_SIZE);

    let capacity_sectors = capacity_bytes() / SECTOR_SIZE as u64;
    if sector >= capacity_sectors {
        return Err(RequestError::SectorOutOfRange { sector, capacity_sectors });
    }

    // Safety: `QUEUE` and `REQUEST` are initialized by `init` before this
    // function is ever reachable (fs/syscall layers only run after boot),
    // and the driver model is single-outstanding, so no other caller is
    // concurrently touching either.
    unsafe {
        let req = &mut *REQUEST;
        req.req_type = if is_write { VIRTIO_BLK_T_OUT } else { VIRTIO_BLK_T_IN };
        req.reserved = 0;
        req.sector = sector;
        req.status = 0xff;
        if is_write {
            req.data.copy_from_slice(buf);
        }

        let queue = &mut *QUEUE;
        queue.descs[0] = VirtqDesc {
            addr: core::ptr::addr_of!(req.req_type) as u64,
            len: 16,
            flags: DescFlags::NEXT.bits(),
            next: 1,
        };
        let data_flags = if is_write {
            DescFlags::NEXT
        } else {
            DescFlags::NEXT | DescFlags::WRITE
        };
        queue.descs[1] = VirtqDesc {
            addr: core::ptr::addr_of!(req.data) as u64,
            len: SECTOR_SIZE as u32,
            flags: data_flags.bits(),
            next: 2,
        };
        queue.descs[2] = VirtqDesc {
            addr: core::ptr::addr_of!(req.status) as u64,
            len: 1,
            flags: DescFlags::WRITE.bits(),
            next: 0,
        };

        let slot = (queue.avail.index as usize) % VIRTQ_ENTRY_NUM;
        queue.avail.ring[slot] = 0;
        // The device must not observe the bumped `avail.index` before the
        // descriptor chain it points at is fully written (§4.6, §9).
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
        queue.avail.index = queue.avail.index.wrapping_add(1);

        mmio_write32(REG_QUEUE_NOTIFY, 0);
        LAST_SEEN_USED = LAST_SEEN_USED.wrapping_add(1);

        while core::ptr::read_volatile(core::ptr::addr_of!(queue.used.index)) != LAST_SEEN_USED {
            core::hint::spin_loop();
        }

        if req.status != 0 {
            log::warn!("virtio block: device reported status {}", req.status);
            return Err(RequestError::DeviceStatus { status: req.status });
        }

        if !is_write {
            buf.copy_from_slice(&req.data);
        }
    }

    Ok(())
}
