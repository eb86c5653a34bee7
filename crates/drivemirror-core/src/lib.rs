//! drivemirror Core - Domain logic and port definitions
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain entities** - `RemoteItem`, `RemoteFile`, `WalkItem`, `BackupVariant`, `ExportPolicy`
//! - **Port definitions** - Traits for adapters: `IDriveService`, `IRepositoryManager`, `ITokenProvider`
//! - **Configuration** - The YAML configuration file and its validation
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no I/O.
//! Ports define trait interfaces that adapter crates implement.

pub mod config;
pub mod domain;
pub mod ports;
