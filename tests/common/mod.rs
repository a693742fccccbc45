use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

static TRACING: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("genlazy_core=debug")),
        )
        .with_test_writer()
        .try_init();
});

/// Installs a test-writer subscriber once per test binary.
pub fn init_tracing() {
    Lazy::force(&TRACING);
}
