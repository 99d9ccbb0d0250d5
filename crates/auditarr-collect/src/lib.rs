//! Service collectors for auditarr.
//!
//! Each collector talks to one HTTP API and returns core records:
//!
//! - [`ArrClient`] - Sonarr series/episode files and Radarr movie files as
//!   [`ManagedFile`](auditarr_core::ManagedFile)s
//! - [`QbittorrentClient`] - torrents and their payload files as
//!   [`Torrent`](auditarr_core::Torrent)s
//!
//! Every request has a 30 second timeout and can be aborted through a
//! [`CancellationToken`](tokio_util::sync::CancellationToken).

mod arr;
mod error;
mod http;
mod qbittorrent;

pub use arr::{ArrClient, SystemStatus};
pub use error::CollectError;
pub use http::REQUEST_TIMEOUT;
pub use qbittorrent::{QbittorrentClient, map_state};
