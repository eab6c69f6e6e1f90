pub mod analysis;
pub mod api;
pub mod config;
pub mod credentials;
pub mod deletion;
pub mod drive;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod notify;
pub mod progress;
pub mod recommendations;
pub mod storage;
pub mod worker;

pub use config::AppConfig;
pub use engine::{CleanupEngine, SyncResult};
pub use error::Error;
pub use progress::{PipelineReporter, SilentReporter};
