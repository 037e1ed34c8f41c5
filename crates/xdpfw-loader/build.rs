use std::path::PathBuf;
use std::process::Command;

/// Cross-compiles the `xdpfw-ebpf` kernel program for `bpfel-unknown-none`
/// using a nested `cargo +nightly build`, then embeds the resulting ELF via
/// `aya::include_bytes_aligned!` in `src/object.rs`.
///
/// Requirements: nightly toolchain with the `rust-src` component.
/// `crates/xdpfw-ebpf/rust-toolchain.toml` pins the channel for the child
/// cargo invocation.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let manifest_dir = PathBuf::from(std::env::var("CARGO_MANIFEST_DIR")?);
    let ebpf_dir = manifest_dir.parent().ok_or("could not find workspace root")?.join("xdpfw-ebpf");

    println!("cargo:rerun-if-changed={}", ebpf_dir.join("src").display());
    println!("cargo:rerun-if-changed={}", ebpf_dir.join("Cargo.toml").display());

    let out_dir = PathBuf::from(std::env::var("OUT_DIR")?);
    let ebpf_target_dir = out_dir.join("xdpfw-ebpf-target");

    // Cargo running this build script sets RUSTC/RUSTUP_TOOLCHAIN for the
    // *current* (stable) toolchain; unset them so rustup picks the nightly
    // pinned by xdpfw-ebpf's rust-toolchain.toml instead.
    let status = Command::new("cargo")
        .args(["build", "--release"])
        .env("CARGO_TARGET_DIR", &ebpf_target_dir)
        .env_remove("RUSTC")
        .env_remove("RUSTDOC")
        .env_remove("RUSTUP_TOOLCHAIN")
        .env_remove("RUSTC_WORKSPACE_WRAPPER")
        .env_remove("RUSTC_WRAPPER")
        .current_dir(&ebpf_dir)
        .status();

    match status {
        Ok(s) if s.success() => {}
        Ok(s) => {
            return Err(format!(
                "cargo build of xdpfw-ebpf failed (exit {:?}).\n\
                Ensure nightly toolchain and rust-src are installed:\n  \
                rustup toolchain install nightly\n  \
                rustup component add rust-src --toolchain nightly",
                s.code()
            )
            .into());
        }
        Err(e) => return Err(format!("failed to run cargo: {e}").into()),
    }

    let ebpf_bin = ebpf_target_dir.join("bpfel-unknown-none/release/xdpfw-ebpf");
    if !ebpf_bin.exists() {
        return Err(format!("BPF ELF not found at {}", ebpf_bin.display()).into());
    }

    let out_file = out_dir.join("xdpfw.bpf.o");
    std::fs::copy(&ebpf_bin, &out_file)?;

    println!("cargo:rustc-env=XDPFW_BPF_OBJ_BUILT={}", out_file.display());
    Ok(())
}
