fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Source a protoc binary from the vendored crate when one is not already
    // provided by the environment, so the proto build works without a
    // system-installed protobuf compiler.
    if std::env::var_os("PROTOC").is_none() {
        if let Ok(path) = protoc_bin_vendored::protoc_bin_path() {
            std::env::set_var("PROTOC", path);
        }
    }

    tonic_prost_build::configure()
        .build_server(false)
        .build_client(true)
        .compile_protos(&["proto/products.proto"], &["proto"])?;

    println!("cargo:rerun-if-changed=proto/products.proto");
    Ok(())
}
