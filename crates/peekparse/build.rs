use rustc_version::{version_meta, Channel};

// NOTE: This activates the 'nightly' feature described in the Cargo.toml file, so that the core
//       traits carry `rustc_on_unimplemented` messages when built with a nightly compiler.
fn main() {
    if matches!(version_meta().map(|v| v.channel), Ok(Channel::Nightly)) {
        println!("cargo:rustc-cfg=feature=\"nightly\"");
    }
}
