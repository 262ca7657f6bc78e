//! Build script for proto compilation.
//!
//! Compiles the Terraform plugin protocol (`proto/tfplugin6.proto`) into
//! `$OUT_DIR/tfplugin6.rs`, which `src/generated.rs` includes. Only the
//! server half is generated: Terraform is always the client.

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tonic_prost_build::configure()
        .build_client(false)
        .build_server(true)
        .compile_protos(&["proto/tfplugin6.proto"], &["proto"])?;

    // Always rerun if proto changes
    println!("cargo:rerun-if-changed=proto/tfplugin6.proto");

    Ok(())
}
