//! Syscall numbers and the dispatcher the trap layer calls into on an
//! environment call from user mode (§4.5). Number in `a3`, arguments in
//! `a0..a2`, return value written back into `a0`.

use crate::arch::riscv32::sbi;
use crate::arch::riscv32::trap::TrapFrame;
use crate::error::FatalError;
use crate::fs;
use crate::process;

const SYS_PUTCHAR: usize = 1;
const SYS_GETCHAR: usize = 2;
const SYS_EXIT: usize = 3;
const SYS_READFILE: usize = 4;
const SYS_WRITEFILE: usize = 5;
const SYS_SHUTDOWN: usize = 8;

/// Maximum length of a NUL-terminated filename read out of user memory,
/// matching the archive header's `name[100]` field (§3).
const MAX_NAME_LEN: usize = 100;

pub fn dispatch(frame: &mut TrapFrame) {
    match frame.a3 {
        SYS_PUTCHAR => sbi::console_putchar(frame.a0 as u8),

        SYS_GETCHAR => loop {
            let ch = sbi::console_getchar();
            if ch >= 0 {
                frame.a0 = ch as usize;
                break;
            }
            process::yield_now();
        },

        SYS_EXIT => process::exit_current(),

        SYS_READFILE => {
            frame.a0 = readfile(frame.a0, frame.a1, frame.a2) as usize;
        }

        SYS_WRITEFILE => {
            frame.a0 = writefile(frame.a0, frame.a1, frame.a2) as usize;
        }

        SYS_SHUTDOWN => sbi::shutdown(),

        other => crate::abort(FatalError::UnknownSyscall { number: other as i32 }),
    }
}

/// Reads a NUL-terminated string out of user memory. No alignment or
/// bounds checks are performed on `ptr` (§4.5): the supervisor-user-memory
/// bit in `sstatus` is set once at first user entry specifically so these
/// raw accesses are permitted.
fn read_user_name(ptr: usize) -> ([u8; MAX_NAME_LEN], usize) {
    let mut buf = [0u8; MAX_NAME_LEN];
    let src = ptr as *const u8;
    let mut len = 0;
    for (i, slot) in buf.iter_mut().enumerate() {
        // Safety: per §4.5, user pointers are accessed directly under the
        // process's own page table with SUM set; this kernel performs no
        // further validation on them, matching the source design.
        let byte = unsafe { *src.add(i) };
        *slot = byte;
        if byte == 0 {
            break;
        }
        len = i + 1;
    }
    (buf, len)
}

fn readfile(name_ptr: usize, buf_ptr: usize, len: usize) -> isize {
    let (name_buf, name_len) = read_user_name(name_ptr);
    match fs::read_file(&name_buf[..name_len], buf_ptr as *mut u8, len) {
        Ok(n) => n as isize,
        Err(_) => -1,
    }
}

fn writefile(name_ptr: usize, buf_ptr: usize, len: usize) -> isize {
    let (name_buf, name_len) = read_user_name(name_ptr);
    match fs::write_file(&name_buf[..name_len], buf_ptr as *const u8, len) {
        Ok(n) => n as isize,
        Err(_) => -1,
    }
}
