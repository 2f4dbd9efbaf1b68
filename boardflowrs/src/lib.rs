pub mod backends;
pub mod config;
pub mod error;
pub mod filters;
pub mod metrics;
pub mod models;
pub mod persist;
pub mod request;
pub mod resolve;
pub mod results;
pub mod runtime;
pub mod store;

pub use backends::{DataBackend, HttpBackend, MemoryBackend};
pub use config::BoardflowConfig;
pub use error::{BoardflowError, Result};
pub use filters::{normalize, NormalizedFilter};
pub use metrics::{compile_metrics, MetricRequest};
pub use models::{AggregationConfig, ChartKind, Filter, MetricSpec, Widget};
pub use persist::DashboardDocument;
pub use request::{assemble, AggregateRequest, DataRequest, RawRequest};
pub use resolve::{EtlRunResolver, TableResolver};
pub use results::{process, ChartSeries, ProcessedResult, WidgetSeries};
pub use store::DashboardStore;

/// Install a fmt subscriber honoring `RUST_LOG`. For binaries and tests;
/// library callers usually bring their own.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
