fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Tell Cargo to rerun this build script if the proto file changes
    let proto_file = "proto/flow/access.proto";
    println!("cargo:rerun-if-changed={}", proto_file);

    // Only the Access API client is needed; the updater never serves gRPC
    tonic_build::configure()
        .build_server(false)
        .build_client(true)
        .compile(&[proto_file], &["proto"])?;

    Ok(())
}
