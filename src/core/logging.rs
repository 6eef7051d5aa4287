use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// HTTP plumbing logs every connection at debug; keep it out of the way.
const QUIET_CRATES: &[&str] = &["hyper=warn", "reqwest=warn", "warp=warn", "rustls=warn"];

/// Log to stderr so stdout stays free for command output and match lines.
/// `RUST_LOG` overrides the configured level entirely.
pub fn init_logging(log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(log_level)));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .init();

    tracing::debug!("Logging initialized at level: {}", log_level);
}

fn default_directives(log_level: &str) -> String {
    std::iter::once(log_level)
        .chain(QUIET_CRATES.iter().copied())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_quiet_http_crates() {
        let directives = default_directives("debug");
        assert!(directives.starts_with("debug,"));
        assert!(directives.contains("hyper=warn"));
        assert!(EnvFilter::try_new(&directives).is_ok());
    }
}
