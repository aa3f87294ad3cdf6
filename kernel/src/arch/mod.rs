//! Architecture support. This kernel targets exactly one platform: 32-bit
//! RISC-V, single hart, Sv32 paging, SBI firmware.

pub mod riscv32;
