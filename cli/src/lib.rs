//! Terminal host for the PowerGuard admin API.
//!
//! Loads settings, executes the requests `powerguard-core` builds with
//! `ureq`, and renders the list and form views as text.

pub mod app;
pub mod config;
pub mod transport;
pub mod views;

pub use app::App;
pub use config::{Overrides, Settings};
pub use transport::{Transport, UreqTransport};

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing(verbose: bool) {
    let default = if verbose {
        "powerguard=debug,powerguard_cli=debug,powerguard_core=debug"
    } else {
        "powerguard=info,powerguard_cli=info,powerguard_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
