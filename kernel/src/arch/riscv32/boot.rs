//! Entry point reached from the boot stub.
//!
//! The boot stub itself (setting `sp` from `__stack_top` and jumping here)
//! is out of scope per SPEC_FULL.md §1 — it is an external collaborator, not
//! part of the specified design surface. It still has to exist for the
//! image to run, so a minimal one is carried here as a `global_asm!` island,
//! in the same style the boot assembly in this codebase always takes: set
//! `sp`, jump to Rust.

use core::arch::global_asm;

global_asm!(
    r#"
.section .text.boot
.global _boot
_boot:
    la sp, __stack_top
    j {entry}
"#,
    entry = sym _start_rust
);

extern "C" {
    fn kernel_main() -> !;
}

#[no_mangle]
extern "C" fn _start_rust() -> ! {
    unsafe { kernel_main() }
}
