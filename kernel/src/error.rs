//! Kernel error taxonomy.
//!
//! Scoped to exactly the three families the design calls for: fatal-abort,
//! request-failure, and truncation. Truncation is not an error at all (it is
//! a silent cap applied by the caller) and so has no variant here.

use core::fmt;

/// Errors that halt the kernel. Formatted and logged once, then the kernel
/// parks in a wait-for-interrupt loop; there is no recovery path.
#[derive(Debug, Clone, Copy)]
pub enum FatalError {
    /// The frame allocator's cursor would cross `__free_ram_end`.
    OutOfMemory { requested_pages: u32 },
    /// `map_page` was called with a `vaddr` or `paddr` that is not 4 KiB aligned.
    UnalignedMapping { vaddr: usize, paddr: usize },
    /// A trap arrived from a mode other than user, or with an unrecognized cause.
    UnexpectedTrap { scause: usize, stval: usize, sepc: usize },
    /// `a3` at an `ecall` did not match any entry in the syscall table.
    UnknownSyscall { number: i32 },
    /// The virtio-blk MMIO region failed a magic/version/device-id check.
    DriverSanity { magic: u32, version: u32, device_id: u32 },
    /// The process table has no UNUSED slot left.
    ProcessTableFull,
    /// `yield` was invoked with no RUNNABLE slot and no idle process installed.
    SchedulerInvariant,
}

impl fmt::Display for FatalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            FatalError::OutOfMemory { requested_pages } => {
                write!(f, "out of memory: requested {} pages", requested_pages)
            }
            FatalError::UnalignedMapping { vaddr, paddr } => write!(
                f,
                "unaligned mapping: vaddr={:#x} paddr={:#x}",
                vaddr, paddr
            ),
            FatalError::UnexpectedTrap { scause, stval, sepc } => write!(
                f,
                "unexpected trap: scause={:#x} stval={:#x} sepc={:#x}",
                scause, stval, sepc
            ),
            FatalError::UnknownSyscall { number } => write!(f, "unknown syscall: {}", number),
            FatalError::DriverSanity { magic, version, device_id } => write!(
                f,
                "virtio sanity check failed: magic={:#x} version={} device_id={}",
                magic, version, device_id
            ),
            FatalError::ProcessTableFull => write!(f, "process table full"),
            FatalError::SchedulerInvariant => write!(f, "no runnable process and no idle process"),
        }
    }
}

/// Errors reported back to a caller without halting the kernel. Syscalls
/// surface these as `-1`; the driver logs them and returns without I/O.
#[derive(Debug, Clone, Copy)]
pub enum RequestError {
    /// `fs_lookup` found no file with the requested name.
    FileNotFound,
    /// The requested sector lies at or beyond the device's reported capacity.
    SectorOutOfRange { sector: u64, capacity_sectors: u64 },
    /// The device completed a request with a non-zero status byte.
    DeviceStatus { status: u8 },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RequestError::FileNotFound => write!(f, "file not found"),
            RequestError::SectorOutOfRange { sector, capacity_sectors } => write!(
                f,
                "sector {} out of range (capacity {} sectors)",
                sector, capacity_sectors
            ),
            RequestError::DeviceStatus { status } => {
                write!(f, "device reported status {}", status)
            }
        }
    }
}

pub type KernelResult<T> = Result<T, RequestError>;
