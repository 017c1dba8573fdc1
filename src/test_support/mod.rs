//! Internal helpers re-exported for integration tests.
//!
//! Provides in-memory collaborators ([`FakeRegistry`], [`FakeTransport`],
//! [`RecordingToolCache`]), runner fixtures, and log capture so behavioural
//! tests can drive a full setup without network access.

mod fakes;
mod fixtures;
mod logging;

pub use fakes::{DownloadRequest, FakeRegistry, FakeTransport, RecordingToolCache};
pub use fixtures::{TEST_TOKEN, action_config, test_runtime, write_bundle_archive};
pub use logging::capture_warn_logs;
