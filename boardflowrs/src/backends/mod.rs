//! Aggregation backend implementations.
//!
//! The query endpoints themselves are external; these types cover the
//! client side of that boundary. `HttpBackend` talks to the real endpoints,
//! `MemoryBackend` serves canned rows for tests.

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::error::Result;
use crate::request::{AggregateRequest, DistinctRequest, RawRequest};

pub type Rows = Vec<Map<String, Value>>;

/// Unified interface to the dashboard data endpoints.
#[async_trait]
pub trait DataBackend: Send + Sync {
    /// `POST /api/dashboard/aggregate-data`: one row per group.
    async fn aggregate_data(&self, request: &AggregateRequest) -> Result<Rows>;
    /// `POST /api/dashboard/raw-data`: ungrouped rows.
    async fn raw_data(&self, request: &RawRequest) -> Result<Rows>;
    /// `POST /api/dashboard/distinct-values`: flat list for filter dropdowns.
    async fn distinct_values(&self, request: &DistinctRequest) -> Result<Vec<Value>>;
}

mod http;
pub use http::HttpBackend;

mod memory;
pub use memory::MemoryBackend;
