use std::env;
use std::path::PathBuf;

fn main() {
    let target = env::var("TARGET").expect("TARGET not set");
    if target.starts_with("riscv32") {
        let manifest_dir =
            PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
        let linker_script = manifest_dir.join("link.ld");
        println!("cargo:rustc-link-arg-bin=shell=-T{}", linker_script.display());
        println!("cargo:rerun-if-changed={}", linker_script.display());
    }
}
