/// Reporting collaborator: where keyword-level messages go. A test harness
/// embedding the recorder routes these into its own log; the default
/// implementation forwards to `tracing`.
pub trait Reporter: Send + Sync {
    /// `markup` marks messages that carry report markup (e.g. an embedded
    /// image tag) rather than plain text.
    fn info(&self, message: &str, markup: bool);

    fn warn(&self, message: &str);
}

pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str, markup: bool) {
        if markup {
            tracing::info!(markup = true, "{message}");
        } else {
            tracing::info!("{message}");
        }
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Convenience subscriber setup for harnesses that do not configure their own.
pub fn init_logging(verbose: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = if verbose {
        EnvFilter::new("debug").add_directive("chromiumoxide=info".parse().unwrap())
    } else {
        EnvFilter::from_default_env()
            .add_directive("warn".parse().unwrap())
            .add_directive("chromiumoxide=off".parse().unwrap())
    };

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
