//! # Dose sync worker
//!
//! Delivers locally recorded dose events to the remote ingress and flips
//! their `synced` flag once the remote acknowledges them.
//!
//! ```text
//! ┌──────────────┐   unsynced    ┌─────────────────┐   POST   ┌──────────┐
//! │ DoseEvent    │──────────────▶│ DoseSyncCoord.  │─────────▶│ Ingress  │
//! │ Store        │◀──────────────│ (one pass)      │◀─────────│ (remote) │
//! └──────────────┘  mark_synced  └────────▲────────┘   2xx    └──────────┘
//!                                         │
//!                           ┌─────────────┴──────────────┐
//!                           │ DoseSyncWorker             │
//!                           │ request_sync / reconnect   │
//!                           └─────────────▲──────────────┘
//!                                         │
//!                                ConnectivityMonitor
//! ```
//!
//! - Each event is an independent attempt; a failure leaves it unsynced for
//!   the next pass.
//! - A pass is skipped while offline and stops as soon as connectivity drops.
//! - Credentials are refreshed before every pass.
//! - The flag flip is conditional on the record revision read at the start
//!   of the pass, so a correction made during delivery is not lost.

mod connectivity;
mod coordinator;
mod credentials;
mod error;
mod remote;
mod worker;

#[cfg(test)]
mod test_support;

pub use connectivity::{
    spawn_probe_loop, ConnectivityHandle, ConnectivityMonitor, ConnectivityProbe,
    HttpConnectivityProbe,
};
pub use coordinator::{DoseSyncCoordinator, PassOutcome, SyncPassReport, SyncStatus};
pub use credentials::{AccessTokenProvider, SessionTokens, StaticAccessToken, SupabaseTokenRefresher};
pub use error::{SyncError, SyncResult};
pub use remote::{DoseEventIngressClient, DoseEventRemote};
pub use worker::{DoseSyncWorker, SyncTrigger};
