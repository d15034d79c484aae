use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Events are logged under `alt_tab::*` targets; anything else only at warn.
const TARGETS: [&str; 2] = ["alt_tab", "spaces_alt_tab"];

/// Initialize stderr logging. `RUST_LOG`, when set, replaces the defaults;
/// `verbose` raises them from info to debug.
pub fn init_logging(verbose: bool) {
    let level = if verbose { LevelFilter::DEBUG } else { LevelFilter::INFO };
    let mut filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_none() {
        for directive in default_directives(level) {
            filter = filter.add_directive(directive);
        }
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true),
        )
        .with(filter)
        .init();
}

fn default_directives(level: LevelFilter) -> Vec<Directive> {
    TARGETS
        .iter()
        .filter_map(|target| format!("{target}={level}").parse().ok())
        .collect()
}
