//! Lavapool Common Types
//!
//! This crate provides the shared domain models and error taxonomy for the
//! lavapool audio-node runtime.
//!
//! # Overview
//!
//! Lavapool is a client-side runtime for coordinating a pool of remote
//! audio-processing nodes. Each node exposes a stateful control channel plus
//! a stateless REST query interface. This crate contains the types shared by
//! all components:
//!
//! - **Tracks**: [`Track`], [`TrackPlaylist`] and the raw REST response
//!   shapes they are decoded from
//! - **Statistics**: [`NodeStats`] load reports and the [`Penalty`]
//!   load-balancing score derived from them
//! - **Errors**: the single [`LavapoolError`] enum and [`Result`] alias
//!
//! # Example
//!
//! ```
//! use lavapool_common::{LoadTracksResponse, SENTINEL_PENALTY};
//!
//! let body = r#"{"tracks": [], "playlistInfo": null}"#;
//! let decoded: LoadTracksResponse = serde_json::from_str(body).unwrap();
//! assert!(decoded.tracks.is_empty());
//! assert!(SENTINEL_PENALTY > 1e30);
//! ```

pub mod error;
pub mod stats;
pub mod track;

pub use error::{LavapoolError, Result};
pub use stats::{CpuStats, FrameStats, MemoryStats, NodeStats, Penalty, SENTINEL_PENALTY};
pub use track::{LoadTracksResponse, PlaylistInfo, RawTrack, Track, TrackInfo, TrackPlaylist};
