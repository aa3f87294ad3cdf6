//! Build-time collaborators that are deliberately out of the specified
//! design surface (§1) but still have to exist for the image to link and
//! run: selecting the riscv32 linker script, and building + flattening the
//! bundled user shell so `lib.rs` can `include_bytes!` it.
//!
//! The disk archive (§4.7, §6) is *not* embedded here — it is a separate
//! artifact handed to the emulator as the virtio-blk backing store, read by
//! `fs::load` over the driver at boot, not linked into the kernel image.

use std::env;
use std::path::PathBuf;
use std::process::Command;

const USER_TARGET: &str = "riscv32imac-unknown-none-elf";

fn main() {
    let target = env::var("TARGET").expect("TARGET not set");
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set"));

    if target.starts_with("riscv32") {
        let linker_script = manifest_dir.join("src/arch/riscv32/link.ld");
        println!("cargo:rustc-link-arg-bin=rvos-kernel=-T{}", linker_script.display());
        println!("cargo:rerun-if-changed={}", linker_script.display());
    }

    let user_image_path = build_user_shell(&manifest_dir, &out_dir);
    println!("cargo:rustc-env=RVOS_USER_IMAGE_PATH={}", user_image_path.display());

    println!("cargo:rerun-if-changed=../userland");
}

/// Recursively builds the bundled shell for the riscv32 target and
/// flattens its ELF into a raw binary loadable at `mm::USER_BASE`, the way
/// the `bootloader` crate's own build script drives a nested `cargo build`
/// for its stage-2 loader.
fn build_user_shell(manifest_dir: &PathBuf, out_dir: &PathBuf) -> PathBuf {
    let userland_dir = manifest_dir.join("../userland");
    let user_target_dir = out_dir.join("userland-target");

    let status = Command::new(env::var("CARGO").unwrap_or_else(|_| "cargo".into()))
        .current_dir(&userland_dir)
        .args([
            "build",
            "--release",
            "--target",
            USER_TARGET,
            "--target-dir",
        ])
        .arg(&user_target_dir)
        .status();

    match status {
        Ok(s) if s.success() => {}
        Ok(s) => panic!("building bundled user shell failed with status {s}"),
        Err(e) => panic!("failed to invoke cargo for the bundled user shell: {e}"),
    }

    let elf_path = user_target_dir
        .join(USER_TARGET)
        .join("release")
        .join("shell");

    let bin_path = out_dir.join("shell.bin");
    let objcopy = env::var("OBJCOPY").unwrap_or_else(|_| "rust-objcopy".into());
    let status = Command::new(&objcopy)
        .args(["-O", "binary"])
        .arg(&elf_path)
        .arg(&bin_path)
        .status();

    match status {
        Ok(s) if s.success() => {}
        Ok(s) => panic!("{objcopy} failed with status {s}"),
        Err(e) => panic!("failed to invoke {objcopy}: {e}"),
    }

    bin_path
}
