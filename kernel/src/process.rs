//! The fixed-size process table and the cooperative round-robin scheduler.
//!
//! All of it is single-writer by construction (§5): there is exactly one
//! hart and no preemption, so the table, the current/idle slot indices, and
//! every process's saved stack pointer are held in plain `static mut`
//! globals behind small unsafe accessors, the same idiom `sscratch`/`satp`
//! get in the `csr` module, rather than behind a `spin::Mutex` that would
//! buy nothing here.

use core::arch::global_asm;

use crate::arch::riscv32::{csr, wait_forever};
use crate::error::FatalError;
use crate::mm::page_table::PageTable;
use crate::mm::{self, USER_BASE};
use crate::util;

pub const PROCS_MAX: usize = 8;
const STACK_SIZE: usize = 8192;
const CONTEXT_WORDS: usize = 13;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcState {
    Unused,
    Runnable,
    Exited,
}

/// One process control block. `pid == 0` is reserved for the idle process
/// (§3); every other slot's pid is its table index plus one.
#[derive(Clone, Copy)]
#[repr(C)]
pub struct Process {
    pub pid: usize,
    pub state: ProcState,
    sp: usize,
    page_table: *mut PageTable,
    stack: [u8; STACK_SIZE],
}

impl Process {
    const fn unused() -> Self {
        Process {
            pid: 0,
            state: ProcState::Unused,
            sp: 0,
            page_table: core::ptr::null_mut(),
            stack: [0; STACK_SIZE],
        }
    }
}

static mut PROC_TABLE: [Process; PROCS_MAX] = [Process::unused(); PROCS_MAX];
static mut CURRENT: usize = 0;
static mut IDLE: usize = 0;

unsafe fn table() -> &'static mut [Process; PROCS_MAX] {
    // Safety: single-hart, no preemption — every caller in this module runs
    // to completion before the next one touches the table.
    unsafe { &mut *core::ptr::addr_of_mut!(PROC_TABLE) }
}

/// The trampoline a freshly created user process's saved `ra` points at: it
/// never returns from a normal call, so the 13-word saved-register frame
/// only needs a valid `ra` to "return" into it on first dispatch.
global_asm!(
    r#"
.section .text
.align 2
.global rvos_user_entry
rvos_user_entry:
    li t0, {entry}
    csrw sepc, t0
    li t1, {sstatus}
    csrw sstatus, t1
    sret
"#,
    entry = const USER_BASE,
    sstatus = const (csr::SSTATUS_SPIE | csr::SSTATUS_SUM),
);

extern "C" {
    fn rvos_user_entry();
}

/// Saves the 13 callee-saved words (`ra, s0..s11`) of the outgoing process
/// and restores those of the incoming one, per §4.3. No suspension point
/// exists inside it: from the scheduler's view it is atomic.
global_asm!(
    r#"
.section .text
.align 2
.global rvos_switch_context
rvos_switch_context:
    addi sp, sp, -13 * 4
    sw ra,   0 * 4(sp)
    sw s0,   1 * 4(sp)
    sw s1,   2 * 4(sp)
    sw s2,   3 * 4(sp)
    sw s3,   4 * 4(sp)
    sw s4,   5 * 4(sp)
    sw s5,   6 * 4(sp)
    sw s6,   7 * 4(sp)
    sw s7,   8 * 4(sp)
    sw s8,   9 * 4(sp)
    sw s9,   10 * 4(sp)
    sw s10,  11 * 4(sp)
    sw s11,  12 * 4(sp)

    sw sp, (a0)
    lw sp, (a1)

    lw ra,   0 * 4(sp)
    lw s0,   1 * 4(sp)
    lw s1,   2 * 4(sp)
    lw s2,   3 * 4(sp)
    lw s3,   4 * 4(sp)
    lw s4,   5 * 4(sp)
    lw s5,   6 * 4(sp)
    lw s6,   7 * 4(sp)
    lw s7,   8 * 4(sp)
    lw s8,   9 * 4(sp)
    lw s9,   10 * 4(sp)
    lw s10,  11 * 4(sp)
    lw s11,  12 * 4(sp)
    addi sp, sp, 13 * 4
    ret
"#
);

extern "C" {
    fn rvos_switch_context(prev_sp: *mut usize, next_sp: *mut usize);
}

/// Lays out the initial 13-word saved-register frame at the top of a fresh
/// process's stack: `ra = entry`, every callee-saved register zero. The
/// first switch into this process "returns" straight into `entry`.
fn prime_stack(stack_top: usize, entry: usize) -> usize {
    let sp = stack_top - CONTEXT_WORDS * core::mem::size_of::<usize>();
    // Safety: `sp` lies inside the process's own `stack` array, which this
    // function's only caller (`create`) just allocated exclusively.
    unsafe {
        let base = sp as *mut usize;
        base.write(entry);
        for i in 1..CONTEXT_WORDS {
            base.add(i).write(0);
        }
    }
    sp
}

fn create(pid: usize, image: Option<&[u8]>, entry: usize) -> usize {
    // Safety: see `table`.
    let procs: &mut [Process; PROCS_MAX] = unsafe { table() };
    let Some(slot) = procs.iter().position(|p| p.state == ProcState::Unused) else {
        crate::abort(FatalError::ProcessTableFull);
    };

    let root = PageTable::blank();
    mm::map_kernel_identity(root);
    if let Some(image) = image {
        mm::map_user_image(root, image);
    }

    let stack_top = procs[slot].stack.as_ptr() as usize + STACK_SIZE;
    procs[slot].sp = prime_stack(stack_top, entry);
    procs[slot].page_table = root as *mut PageTable;
    procs[slot].pid = pid;
    procs[slot].state = ProcState::Runnable;
    slot
}

/// Creates the idle process: no image, no user mapping, entry point is the
/// kernel-resident `wfi` loop. See SPEC_FULL.md's resolution of the
/// idle-process Open Question — it is a real, schedulable process, just one
/// that never leaves supervisor mode.
pub fn init_idle() -> usize {
    create(0, None, wait_forever as usize)
}

/// Creates the one user process this kernel ever runs, mapping `image`
/// (a flat binary) at `USER_BASE` and pointing its first dispatch at the
/// `rvos_user_entry` trampoline.
pub fn spawn_user(image: &[u8]) -> usize {
    create(1, Some(image), rvos_user_entry as usize)
}

/// Records which slot is idle and which is current at boot, before the
/// first `yield_now`.
pub fn bootstrap(idle_slot: usize) {
    // Safety: called once, before any other process-table access.
    unsafe {
        IDLE = idle_slot;
        CURRENT = idle_slot;
    }
}

/// Marks the current process EXITED and yields. Per §4.5 this must never
/// return — an EXITED slot is unreachable by the scheduler's scan — so a
/// return here is a scheduler invariant violation.
pub fn exit_current() -> ! {
    // Safety: see `table`.
    unsafe { table()[CURRENT].state = ProcState::Exited };
    yield_now();
    crate::abort(FatalError::SchedulerInvariant);
}

/// Round-robins to the next RUNNABLE user process, falling back to idle,
/// per §4.3. A no-op if the selection doesn't change.
pub fn yield_now() {
    // Safety: see `table`; the raw pointers taken below are only ever
    // handed to `rvos_switch_context`, which treats them as plain `usize`
    // storage and does not alias anything else live at the call site.
    unsafe {
        let procs = table();
        let current = CURRENT;

        let mut runnable = [false; PROCS_MAX];
        for i in 0..PROCS_MAX {
            runnable[i] = procs[i].state == ProcState::Runnable && procs[i].pid > 0;
        }
        let next = util::next_runnable_index(current, &runnable, IDLE);
        if next == current {
            return;
        }

        csr::write_satp_fenced(mm::satp_for_root(procs[next].page_table));

        let stack_top = procs[next].stack.as_ptr() as usize + STACK_SIZE;
        csr::write_sscratch(stack_top);

        let prev_sp = core::ptr::addr_of_mut!(procs[current].sp);
        let next_sp = core::ptr::addr_of_mut!(procs[next].sp);
        CURRENT = next;
        rvos_switch_context(prev_sp, next_sp);
    }
}
