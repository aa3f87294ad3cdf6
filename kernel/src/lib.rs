//! Library root: module wiring, the fatal-abort sink, and the boot
//! sequence (§2).
//!
//! Everything that touches a CSR, an `extern "C"` linker symbol, or raw
//! assembly is declared under `#[cfg(target_arch = "riscv32")]` so a plain
//! host `cargo test` can still build and run the pure-logic unit tests in
//! `mm`, `util`, and `error` without a cross target. See DESIGN.md.

#![cfg_attr(target_arch = "riscv32", no_std)]

#[cfg(target_arch = "riscv32")]
pub mod arch;
#[cfg(target_arch = "riscv32")]
pub mod console;
pub mod error;
#[cfg(target_arch = "riscv32")]
pub mod fs;
pub mod mm;
#[cfg(target_arch = "riscv32")]
pub mod process;
#[cfg(target_arch = "riscv32")]
pub mod syscall;
pub mod util;
#[cfg(target_arch = "riscv32")]
pub mod virtio_blk;

use error::FatalError;

/// The shell binary built and flattened by `build.rs`, mapped at
/// `mm::USER_BASE`. Embedding the user image is an external, build-time
/// concern (§1) — this is just the slice the kernel maps in.
#[cfg(target_arch = "riscv32")]
static USER_IMAGE: &[u8] = include_bytes!(env!("RVOS_USER_IMAGE_PATH"));

#[cfg(target_arch = "riscv32")]
extern "C" {
    static mut __bss: u8;
    static __bss_end: u8;
}

#[cfg(target_arch = "riscv32")]
fn zero_bss() {
    // Safety: `[__bss, __bss_end)` is this image's own bss region, named by
    // the linker script, and nothing has read a `static mut` yet.
    unsafe {
        let start = core::ptr::addr_of_mut!(__bss);
        let end = core::ptr::addr_of!(__bss_end);
        let len = end as usize - start as usize;
        core::ptr::write_bytes(start, 0, len);
    }
}

/// Logs a fatal error with its call site and parks the hart forever (§7).
/// Every fatal-abort variant is logged exactly once here; there is no
/// recovery path and this function never returns.
#[track_caller]
pub fn abort(err: FatalError) -> ! {
    let location = core::panic::Location::caller();
    log::error!("fatal: {} at {}:{}", err, location.file(), location.line());
    park_forever()
}

#[cfg(target_arch = "riscv32")]
fn park_forever() -> ! {
    arch::riscv32::wait_forever()
}

#[cfg(not(target_arch = "riscv32"))]
fn park_forever() -> ! {
    unreachable!("abort() is only reachable once the kernel is actually booted")
}

/// Reached from the boot stub (`arch::riscv32::boot::_start_rust`) with the
/// stack already set to `__stack_top`. Runs the exact boot sequence §8's
/// scenario 1 pins, then becomes the idle process's own `yield` loop.
#[cfg(target_arch = "riscv32")]
#[no_mangle]
pub extern "C" fn kernel_main() -> ! {
    console::info(format_args!("Booting"));

    zero_bss();
    console::info(format_args!("Initializing .bss"));

    console::init_logging();

    arch::riscv32::trap::install();
    console::info(format_args!("Initializing trap handler"));

    console::info(format_args!("Initializing virtio block"));
    virtio_blk::init();

    let idle = process::init_idle();
    process::bootstrap(idle);
    console::info(format_args!("Initializing idle process"));

    process::spawn_user(USER_IMAGE);
    console::info(format_args!("Initializing user process"));

    fs::load();
    console::info(format_args!("Initializing file system"));

    console::info(format_args!("Booted successfully"));
    console::info(format_args!("Switching to user shell"));

    loop {
        process::yield_now();
    }
}
