//! Concrete reachability probes reported in health snapshots

use async_trait::async_trait;
use libris_monitor_core::{
    CACHE_PROBE, CacheLayer, DATABASE_PROBE, LibraryDataSource, MonitorError, ReachabilityProbe,
    Result,
};
use std::sync::Arc;

/// Pings the library data source
pub struct DataSourceProbe {
    source: Arc<dyn LibraryDataSource>,
}

impl DataSourceProbe {
    /// Probe pinging `source`
    pub fn new(source: Arc<dyn LibraryDataSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl ReachabilityProbe for DataSourceProbe {
    fn name(&self) -> &str {
        DATABASE_PROBE
    }

    async fn check(&self) -> Result<()> {
        self.source.ping().await?;
        Ok(())
    }
}

/// Writes and reads back a sentinel entry in an in-process cache
///
/// Aggregates are cached in process memory, so this only proves the cache
/// machinery accepts and returns values. It stands in for a check against
/// an external cache backend; a deployment with one registers its own
/// [`CACHE_PROBE`] probe instead.
pub struct CacheRoundTripProbe {
    cache: CacheLayer<String>,
}

impl CacheRoundTripProbe {
    /// Probe over a fresh cache named `health_check`
    pub fn new() -> Self {
        Self {
            cache: CacheLayer::new("health_check"),
        }
    }
}

impl Default for CacheRoundTripProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReachabilityProbe for CacheRoundTripProbe {
    fn name(&self) -> &str {
        CACHE_PROBE
    }

    async fn check(&self) -> Result<()> {
        let sentinel = uuid::Uuid::new_v4().to_string();
        if self.cache.round_trip_check(sentinel).await {
            Ok(())
        } else {
            Err(MonitorError::computation("cache round trip returned a different value"))
        }
    }
}
