//! In-memory archive filesystem: `FILES_MAX` resident files backed by a
//! USTAR-subset archive on the block device (§3, §4.7).
//!
//! The on-disk image is read and written through `virtio_blk` one sector at
//! a time into a bump-sized `disk[]` buffer. The buffer's size is
//! `align_up(size_of::<File>() * FILES_MAX, 512)` — a direct carry-over of
//! the original's sizing formula, including its quirk of being sized off
//! the in-memory record rather than the archive's actual worst-case
//! on-disk footprint (header + up to 1024 bytes of data per file). See
//! DESIGN.md.

use crate::error::{KernelResult, RequestError};
use crate::util;
use crate::virtio_blk::{self, SECTOR_SIZE};

pub const FILES_MAX: usize = 2;
const FILE_NAME_MAX: usize = 100;
const FILE_DATA_MAX: usize = 1024;

const TAR_MAGIC: &[u8; 6] = b"ustar\0";

// Byte offsets of each USTAR header field (§3). The header is handled as a
// flat 512-byte slice rather than a `#[repr(C)]` struct, since every field
// is read or written at most once per file and a typed overlay would need
// the same unsafe reinterpretation a slice-offset view avoids.
const OFF_NAME: usize = 0;
const LEN_NAME: usize = 100;
const OFF_MODE: usize = 100;
const OFF_SIZE: usize = 124;
const LEN_SIZE: usize = 12;
const OFF_CHECKSUM: usize = 148;
const LEN_CHECKSUM: usize = 8;
const OFF_TYPEFLAG: usize = 156;
const OFF_MAGIC: usize = 257;
const LEN_MAGIC: usize = 6;
const OFF_VERSION: usize = 263;

#[derive(Clone, Copy)]
struct File {
    in_use: bool,
    name: [u8; FILE_NAME_MAX],
    data: [u8; FILE_DATA_MAX],
    size: usize,
}

impl File {
    const fn empty() -> Self {
        File {
            in_use: false,
            name: [0; FILE_NAME_MAX],
            data: [0; FILE_DATA_MAX],
            size: 0,
        }
    }
}

const DISK_SIZE: usize = util::align_up(core::mem::size_of::<File>() * FILES_MAX, SECTOR_SIZE);

static mut FILES: [File; FILES_MAX] = [File::empty(); FILES_MAX];
static mut DISK: [u8; DISK_SIZE] = [0; DISK_SIZE];

unsafe fn files() -> &'static mut [File; FILES_MAX] {
    // Safety: single-hart, single-writer — see `process::table`.
    unsafe { &mut *core::ptr::addr_of_mut!(FILES) }
}

unsafe fn disk() -> &'static mut [u8; DISK_SIZE] {
    // Safety: single-hart, single-writer — see `process::table`.
    unsafe { &mut *core::ptr::addr_of_mut!(DISK) }
}

fn name_len(name: &[u8]) -> usize {
    name.iter().position(|&b| b == 0).unwrap_or(name.len())
}

/// Reads the whole `disk[]` buffer from the device, sector by sector, then
/// walks the archive it contains, populating up to `FILES_MAX` file slots.
/// A failed sector read is logged and stops the load early, leaving
/// whatever slots were already parsed.
pub fn load() {
    // Safety: see `disk`.
    let buf = unsafe { disk() };
    for (i, chunk) in buf.chunks_mut(SECTOR_SIZE).enumerate() {
        if let Err(e) = virtio_blk::read_write_disk(chunk, i as u64, false) {
            log::warn!("fs: failed to read sector {} during load: {}", i, e);
            return;
        }
    }

    // Safety: see `files`.
    let slots = unsafe { files() };
    let mut offset = 0usize;
    let mut count = 0usize;
    while count < FILES_MAX && offset + SECTOR_SIZE <= buf.len() {
        let header = &buf[offset..offset + SECTOR_SIZE];
        if header[OFF_NAME] == 0 {
            break;
        }
        if &header[OFF_MAGIC..OFF_MAGIC + LEN_MAGIC] != TAR_MAGIC {
            break;
        }

        let size = util::parse_octal(&header[OFF_SIZE..OFF_SIZE + LEN_SIZE]);
        let nlen = name_len(&header[OFF_NAME..OFF_NAME + LEN_NAME]).min(FILE_NAME_MAX);

        let data_start = offset + SECTOR_SIZE;
        let available = buf.len().saturating_sub(data_start);
        let copy_len = size.min(FILE_DATA_MAX).min(available);

        let slot = &mut slots[count];
        slot.name = [0; FILE_NAME_MAX];
        slot.name[..nlen].copy_from_slice(&buf[offset..offset + nlen]);
        slot.data = [0; FILE_DATA_MAX];
        slot.data[..copy_len].copy_from_slice(&buf[data_start..data_start + copy_len]);
        slot.size = copy_len;
        slot.in_use = true;

        offset += util::align_up(SECTOR_SIZE + size, SECTOR_SIZE);
        count += 1;
    }
}

/// Re-serializes every in-use file into `disk[]` and writes it back to the
/// device sector by sector (§4.7).
fn flush() -> KernelResult<()> {
    // Safety: see `disk`/`files`.
    let (buf, slots) = unsafe { (disk(), files()) };
    buf.fill(0);

    let mut offset = 0usize;
    for slot in slots.iter() {
        if !slot.in_use {
            continue;
        }
        if offset + SECTOR_SIZE > buf.len() {
            log::warn!("fs: archive image too small to flush all files");
            break;
        }

        let nlen = name_len(&slot.name);
        {
            let header = &mut buf[offset..offset + SECTOR_SIZE];
            header[OFF_NAME..OFF_NAME + nlen].copy_from_slice(&slot.name[..nlen]);
            header[OFF_MODE..OFF_MODE + 6].copy_from_slice(b"000644");
            header[OFF_TYPEFLAG] = b'0';
            header[OFF_MAGIC..OFF_MAGIC + LEN_MAGIC].copy_from_slice(TAR_MAGIC);
            header[OFF_VERSION..OFF_VERSION + 2].copy_from_slice(b"00");
            util::write_octal(&mut header[OFF_SIZE..OFF_SIZE + LEN_SIZE], slot.size as u32);
            header[OFF_CHECKSUM..OFF_CHECKSUM + LEN_CHECKSUM].fill(b' ');
        }

        let checksum = util::byte_sum(&buf[offset..offset + SECTOR_SIZE]);
        let checksum_field = &mut buf[offset + OFF_CHECKSUM..offset + OFF_CHECKSUM + LEN_CHECKSUM];
        util::write_octal(&mut checksum_field[..6], checksum);
        checksum_field[6] = 0;
        checksum_field[7] = b' ';

        let data_start = offset + SECTOR_SIZE;
        let copy_len = slot.size.min(buf.len().saturating_sub(data_start));
        buf[data_start..data_start + copy_len].copy_from_slice(&slot.data[..copy_len]);

        offset += util::align_up(SECTOR_SIZE + slot.size, SECTOR_SIZE);
    }

    for (i, chunk) in buf.chunks_mut(SECTOR_SIZE).enumerate() {
        virtio_blk::read_write_disk(chunk, i as u64, true)?;
    }
    Ok(())
}

fn lookup(name: &[u8]) -> Option<usize> {
    // Safety: see `files`.
    let slots = unsafe { files() };
    slots
        .iter()
        .position(|f| f.in_use && &f.name[..name_len(&f.name)] == name)
}

/// Copies up to `len` bytes (capped at the file's current size) of `name`
/// into `user_buf`. Returns the byte count copied, or `FileNotFound`.
pub fn read_file(name: &[u8], user_buf: *mut u8, len: usize) -> KernelResult<usize> {
    let idx = lookup(name).ok_or(RequestError::FileNotFound)?;
    // Safety: see `files`.
    let slots = unsafe { files() };
    let n = len.min(slots[idx].size);
    // Safety: `user_buf` is trusted per §4.5's no-validation policy; the
    // process's own page table (with SUM set) is active at the point any
    // syscall reaches here.
    unsafe { core::ptr::copy_nonoverlapping(slots[idx].data.as_ptr(), user_buf, n) };
    Ok(n)
}

/// Copies up to `len` bytes (capped at the 1024-byte data buffer) from
/// `user_buf` into `name`'s data, updates its size, and flushes the whole
/// archive to disk.
pub fn write_file(name: &[u8], user_buf: *const u8, len: usize) -> KernelResult<usize> {
    let idx = lookup(name).ok_or(RequestError::FileNotFound)?;
    let n = len.min(FILE_DATA_MAX);
    // Safety: see `read_file`.
    unsafe {
        let slots = files();
        core::ptr::copy_nonoverlapping(user_buf, slots[idx].data.as_mut_ptr(), n);
        slots[idx].size = n;
    }
    flush()?;
    Ok(n)
}
