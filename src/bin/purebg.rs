//! PureBG CLI Tool
//!
//! Command-line interface for removing image backgrounds with a remote
//! subject-isolation model and a local white-key matte.

#[cfg(feature = "cli")]
use purebg::cli;

#[cfg(feature = "cli")]
#[tokio::main]
async fn main() -> anyhow::Result<std::process::ExitCode> {
    cli::main().await
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
