use std::env;
use std::process::Command;

fn main() {
    // Capture the compiler version for the version_info metric.
    let rustc = env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let version = Command::new(rustc)
        .arg("--version")
        .output()
        .ok()
        .and_then(|out| String::from_utf8(out.stdout).ok())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    println!("cargo:rustc-env=BACKEND_COMMON_RUSTC_VERSION={version}");
    println!("cargo:rerun-if-env-changed=GIT_COMMIT");
}
