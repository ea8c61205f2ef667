//! Datalift CLI support.

/// Initialize tracing for the datalift binary.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("datalift=info")),
        )
        .init();
}
