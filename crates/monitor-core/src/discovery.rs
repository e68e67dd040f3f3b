//! Live-broadcast discovery seam.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BroadcastId, BroadcastInfo};

/// Answers which broadcasts are live and what they are.
///
/// `refresh` is called once per reconcile cycle; the other two methods answer
/// from the state captured by the most recent successful refresh.
#[async_trait]
pub trait LiveDiscovery: Send + Sync {
    /// Re-fetch the listing of live broadcasts.
    async fn refresh(&mut self) -> Result<()>;

    /// Ids of every broadcast live as of the last refresh.
    fn currently_live(&self) -> HashSet<BroadcastId>;

    /// Full metadata for one broadcast; fails with
    /// [`MonitorError::BroadcastNotFound`](crate::MonitorError::BroadcastNotFound)
    /// when the id is unknown.
    async fn metadata(&self, id: &BroadcastId) -> Result<BroadcastInfo>;
}
