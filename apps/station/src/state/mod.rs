//! # State Module
//!
//! State shared by station commands.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  run() ── StationConfig::load ──► DbState::open ──► command            │
//! │                                                                         │
//! │  ┌──────────────────────┐        ┌──────────────────────────────┐      │
//! │  │   DbState            │        │   StationConfig              │      │
//! │  │                      │        │                              │      │
//! │  │  Database            │        │  [database] path, pool size  │      │
//! │  │  (SQLite pool)       │        │  [scanner]  device, timing   │      │
//! │  │                      │        │  [label]    card size        │      │
//! │  └──────────────────────┘        └──────────────────────────────┘      │
//! │                                                                         │
//! │  Commands take only the state they need; `crops` takes none.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;

pub use config::{
    ConfigError, DatabaseSettings, LabelSettings, ScannerSettings, StationConfig,
    CONFIG_FILE_NAME, DB_FILE_NAME,
};
pub use db::DbState;
