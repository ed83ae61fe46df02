pub mod config;
pub mod context;
pub mod error;
pub mod job;
pub mod liveness;
pub mod models;
pub mod orchestrator;
pub mod pager;
pub mod resolver;
pub mod traits;
pub mod view;

#[cfg(test)]
pub mod testutil;

pub use config::ClientConfig;
pub use context::ClientContext;
pub use error::AppError;
pub use job::{CrawlConfig, CrawlJob, CrawlLimit};
pub use liveness::{HeartbeatConfig, LivenessMonitor, LivenessState, TracingLivenessReporter};
pub use models::{Book, BookSource, Endpoint, ResultSet, ResultSource, StoreStats};
pub use orchestrator::CrawlOrchestrator;
pub use pager::PageWindow;
pub use resolver::{EndpointResolver, ResolverConfig};
pub use traits::{Backend, ConfirmGate, Navigator};
pub use view::{Notice, NoticeKind, SearchView};
