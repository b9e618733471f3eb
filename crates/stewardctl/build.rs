// Build script for stewardctl - embeds version at compile time

fn main() {
    // Release builds may override the version; fall back to Cargo.toml
    let version =
        std::env::var("STEWARD_VERSION").unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string());

    println!("cargo:rustc-env=STEWARD_VERSION={}", version);
    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-env-changed=STEWARD_VERSION");
}
