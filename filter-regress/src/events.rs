use std::{collections::HashSet, fmt::Display};

use filter_regress_harness::trace_categories;
use tracing_subscriber::{Layer, filter::Targets, layer::SubscriberExt, util::SubscriberInitExt};

/// Type of event to trace.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, clap::ValueEnum)]
pub enum TraceEvent {
    /// Traces batch file discovery and parsing.
    #[clap(name = "batch")]
    Batch,
    /// Traces launches of generators, the simulator, and the resolver.
    #[clap(name = "exec")]
    Exec,
    /// Traces range expansion and syscall name resolution.
    #[clap(name = "expand")]
    Expand,
    /// Traces batch and record selection.
    #[clap(name = "select")]
    Select,
}

impl Display for TraceEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Batch => write!(f, "batch"),
            Self::Exec => write!(f, "exec"),
            Self::Expand => write!(f, "expand"),
            Self::Select => write!(f, "select"),
        }
    }
}

impl TraceEvent {
    const fn target(self) -> &'static str {
        match self {
            Self::Batch => trace_categories::BATCH,
            Self::Exec => trace_categories::EXEC,
            Self::Expand => trace_categories::EXPAND,
            Self::Select => trace_categories::SELECT,
        }
    }
}

/// Installs the global tracing subscriber. Diagnostics go to stderr so they
/// never interleave with a log written to stdout.
pub(crate) fn init(enabled_trace_events: &[TraceEvent]) {
    let enabled: HashSet<TraceEvent> = enabled_trace_events.iter().copied().collect();

    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .with_filter(compose_filter(&enabled));

    if tracing_subscriber::registry().with(layer).try_init().is_err() {
        // Proceed without tracing but complain audibly.
        eprintln!("warning: failed to initialize tracing.");
    }
}

fn compose_filter(enabled: &HashSet<TraceEvent>) -> Targets {
    Targets::new()
        .with_default(tracing_subscriber::filter::LevelFilter::INFO)
        .with_targets(
            enabled
                .iter()
                .map(|event| (event.target(), tracing::Level::DEBUG)),
        )
}
