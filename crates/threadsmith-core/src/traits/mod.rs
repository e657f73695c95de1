//! Core traits for store operations

mod backend;
mod clock;
mod key;
mod metrics;
mod serializer;
mod tracing;

pub use backend::StoreBackend;
pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{CompositeKey, Identity, Period, StoreKey, keys};
pub use metrics::{NoopMetrics, SegmentationSource, ServiceMetrics, Stage};
pub use serializer::{JsonSerializer, Serializer};
pub use tracing::TracingMetrics;

#[cfg(feature = "metrics")]
pub use metrics::MetricsCrateAdapter;
