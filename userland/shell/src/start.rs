//! Process entry point. Sets `sp` from the linker-provided `__stack_top`
//! and calls into `main`; if `main` ever returns, falls through to `exit`.
//! A direct carry-over of the original user-mode `start()`/`user.c`, just
//! expressed as a `global_asm!` island instead of naked C.

use core::arch::global_asm;

global_asm!(
    r#"
.section .text.start
.global start
start:
    la sp, __stack_top
    call {main}
    call {exit}
"#,
    main = sym crate::shell_main,
    exit = sym crate::syscall::exit,
);
