//! Trap vector and the dispatcher it calls into.
//!
//! The vector is the one genuinely naked-asm island described in
//! SPEC_FULL.md §9: it swaps `sp`/`sscratch`, spills the 31-word trap frame
//! in the order `ra, gp, tp, t0..t6, a0..a7, s0..s11, sp-at-trap`, restores
//! `sscratch` to the supervisor-stack top, and calls `trap_dispatch` with the
//! frame pointer. The surrounding Rust code only ever sees a `&mut TrapFrame`
//! with that exact, packed layout.

use core::arch::global_asm;

use crate::arch::riscv32::csr;
use crate::error::FatalError;
use crate::syscall;

/// The 31 machine words a trap entry persists on the supervisor stack, in
/// the order the vector below spills them. `#[repr(C)]` and every field the
/// same width keep this a flat 124-byte record with no padding.
#[repr(C)]
#[derive(Debug)]
pub struct TrapFrame {
    pub ra: usize,
    pub gp: usize,
    pub tp: usize,
    pub t0: usize,
    pub t1: usize,
    pub t2: usize,
    pub t3: usize,
    pub t4: usize,
    pub t5: usize,
    pub t6: usize,
    pub a0: usize,
    pub a1: usize,
    pub a2: usize,
    pub a3: usize,
    pub a4: usize,
    pub a5: usize,
    pub a6: usize,
    pub a7: usize,
    pub s0: usize,
    pub s1: usize,
    pub s2: usize,
    pub s3: usize,
    pub s4: usize,
    pub s5: usize,
    pub s6: usize,
    pub s7: usize,
    pub s8: usize,
    pub s9: usize,
    pub s10: usize,
    pub s11: usize,
    pub sp: usize,
}

const _: () = assert!(core::mem::size_of::<TrapFrame>() == 31 * 4);

global_asm!(
    r#"
.section .text
.align 2
.global rvos_trap_vector
rvos_trap_vector:
    csrrw sp, sscratch, sp

    addi sp, sp, -124
    sw ra,    0(sp)
    sw gp,    4(sp)
    sw tp,    8(sp)
    sw t0,   12(sp)
    sw t1,   16(sp)
    sw t2,   20(sp)
    sw t3,   24(sp)
    sw t4,   28(sp)
    sw t5,   32(sp)
    sw t6,   36(sp)
    sw a0,   40(sp)
    sw a1,   44(sp)
    sw a2,   48(sp)
    sw a3,   52(sp)
    sw a4,   56(sp)
    sw a5,   60(sp)
    sw a6,   64(sp)
    sw a7,   68(sp)
    sw s0,   72(sp)
    sw s1,   76(sp)
    sw s2,   80(sp)
    sw s3,   84(sp)
    sw s4,   88(sp)
    sw s5,   92(sp)
    sw s6,   96(sp)
    sw s7,  100(sp)
    sw s8,  104(sp)
    sw s9,  108(sp)
    sw s10, 112(sp)
    sw s11, 116(sp)

    csrr a0, sscratch
    sw a0, 120(sp)

    addi a0, sp, 124
    csrw sscratch, a0

    mv a0, sp
    call {dispatch}

    lw ra,    0(sp)
    lw gp,    4(sp)
    lw tp,    8(sp)
    lw t0,   12(sp)
    lw t1,   16(sp)
    lw t2,   20(sp)
    lw t3,   24(sp)
    lw t4,   28(sp)
    lw t5,   32(sp)
    lw t6,   36(sp)
    lw a0,   40(sp)
    lw a1,   44(sp)
    lw a2,   48(sp)
    lw a3,   52(sp)
    lw a4,   56(sp)
    lw a5,   60(sp)
    lw a6,   64(sp)
    lw a7,   68(sp)
    lw s0,   72(sp)
    lw s1,   76(sp)
    lw s2,   80(sp)
    lw s3,   84(sp)
    lw s4,   88(sp)
    lw s5,   92(sp)
    lw s6,   96(sp)
    lw s7,  100(sp)
    lw s8,  104(sp)
    lw s9,  108(sp)
    lw s10, 112(sp)
    lw s11, 116(sp)
    lw sp,  120(sp)
    sret
"#,
    dispatch = sym trap_dispatch,
);

/// Installs the trap vector in direct mode (mode bits = 0; `rvos_trap_vector`
/// is 4-byte aligned by the `.align 2` directive above).
pub fn install() {
    extern "C" {
        fn rvos_trap_vector();
    }
    csr::write_stvec(rvos_trap_vector as usize);
}

/// Called with the frame pointer by the vector above. Reads `scause`/
/// `stval`/`sepc`; an environment call from user mode (cause 8) is routed to
/// the syscall layer and `sepc` is advanced past the 4-byte `ecall`
/// instruction so it is not re-executed. Any other cause is a fatal abort.
#[no_mangle]
extern "C" fn trap_dispatch(frame: &mut TrapFrame) {
    let scause = csr::read_scause();
    let stval = csr::read_stval();
    let sepc = csr::read_sepc();

    if scause == csr::SCAUSE_ECALL_FROM_U {
        syscall::dispatch(frame);
        csr::write_sepc(sepc.wrapping_add(4));
    } else {
        crate::abort(FatalError::UnexpectedTrap { scause, stval, sepc });
    }
}
