//! # Commands Module
//!
//! Everything the station can do, one module per concern.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs      ◄─── You are here (exports)
//! ├── farmer.rs   ◄─── register, list, show, update, delete, crops
//! ├── label.rs    ◄─── label (SVG card + terminal preview), print
//! └── scan.rs     ◄─── scan (live session), scan-image, registry check
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  station --json show F001                                              │
//! │         │                                                               │
//! │         │ (clap)                                                        │
//! │         ▼                                                               │
//! │  lib.rs dispatch                                                        │
//! │  ─────────────                                                          │
//! │  async fn get_farmer(                                                   │
//! │      db: &DbState,          ◄── Opened from StationConfig              │
//! │      id: &str,              ◄── From the command line                  │
//! │  ) -> ApiResult<FarmerDto>                                              │
//! │         │                                                               │
//! │         │ (serde_json or Display)                                       │
//! │         ▼                                                               │
//! │  stdout: {"id":"F001","name":"Jane Doe",...}                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod farmer;
pub mod label;
pub mod scan;
