//! Test utilities for modelex
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suites.
//!
//! - [`ModelFixture`] - a model repository in a temporary directory
//! - [`init_test_logging`] - one-time tracing setup for tests
//!
//! # Example
//!
//! ```rust,no_run
//! use modelex::test_utils::ModelFixture;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let fixture = ModelFixture::compute_vm()?;
//! let store = fixture.store();
//! let vm = store.get_object_definition("Compute", "VM").await?;
//! assert_eq!(vm.key(), Some("Region"));
//! # Ok(())
//! # }
//! ```

pub mod fixtures;

pub use fixtures::ModelFixture;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. With `level` set, that level is used;
/// otherwise `RUST_LOG` is honoured, and without either nothing is logged.
///
/// ```bash
/// RUST_LOG=model::store=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .with_ansi(true)
            .try_init();
    });
}
