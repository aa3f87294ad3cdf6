//! Binary entry point. All real logic lives in the library (`lib.rs`); this
//! crate only supplies the panic handler the `no_std` binary needs and the
//! boot stub's `_boot` symbol the linker script names as `ENTRY`.

#![cfg_attr(target_arch = "riscv32", no_std)]
#![cfg_attr(target_arch = "riscv32", no_main)]

#[cfg(target_arch = "riscv32")]
use core::panic::PanicInfo;

#[cfg(target_arch = "riscv32")]
#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    log::error!("panic: {}", info);
    rvos_kernel::arch::riscv32::wait_forever()
}

#[cfg(not(target_arch = "riscv32"))]
fn main() {}
