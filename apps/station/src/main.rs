//! # Agri Station Entry Point
//!
//! ```text
//! station register F001 "Jane Doe" --crop Maize --crop Rice
//! station label F001 --out F001.svg
//! station scan --once
//! ```
//!
//! The actual setup is in lib.rs for testability.

use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    station::run().await
}
