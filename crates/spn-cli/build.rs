use std::process::Command;

fn main() {
    // Set build date
    let now = chrono::Utc::now();
    println!("cargo:rustc-env=BUILD_DATE={}", now.format("%Y-%m-%d %H:%M:%S UTC"));

    // Set Rust version
    let rustc_version = command_output("rustc", &["--version"]).unwrap_or_else(|| "unknown".to_string());
    println!("cargo:rustc-env=RUSTC_VERSION={}", rustc_version);

    // Build identifier recorded in spn.lock headers
    let revision = command_output("git", &["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "dev".to_string());
    println!("cargo:rustc-env=SPN_BUILD={}-{}", now.format("%Y%m%d"), revision);

    println!("cargo:rerun-if-changed=Cargo.toml");
    println!("cargo:rerun-if-changed=build.rs");
}

fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!text.is_empty()).then_some(text)
}
