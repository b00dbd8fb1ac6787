//! # Repository Module
//!
//! Database repository implementations for Agri Station.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  station command                                                       │
//! │       │                                                                 │
//! │       │  db.farmers().create(&record)                                  │
//! │       ▼                                                                 │
//! │  FarmerRepository                                                      │
//! │  ├── list(&self)                                                       │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── create(&self, record)       → UniqueViolation on duplicate id    │
//! │  ├── update(&self, id, patch)    → NotFound if absent                 │
//! │  └── delete(&self, id)           → the deleted record                 │
//! │       │                                                                 │
//! │       │  SQL Query (FarmerRow ⇄ FarmerRecord)                          │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`FarmerRepository`](farmer::FarmerRepository) - Farmer registry CRUD

pub mod farmer;
