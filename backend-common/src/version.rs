//! Build identification.
//!
//! `COMMIT` defaults to `HEAD` and should be set at build time:
//!
//! ```text
//! GIT_COMMIT=$(git rev-parse --short HEAD) cargo build --release
//! ```

/// Commit the binary was built from.
pub const COMMIT: &str = match option_env!("GIT_COMMIT") {
    Some(commit) => commit,
    None => "HEAD",
};

/// Compiler version used for the build.
pub const RUSTC_VERSION: &str = env!("BACKEND_COMMON_RUSTC_VERSION");

/// Version of this library.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");
