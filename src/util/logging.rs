use crate::util::args;
use owo_colors::{OwoColorize, colors::Green};
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

pub fn success(message: &str) {
    info!("{} {}", "✓".fg::<Green>().bold(), message);
}

/// 0 keeps the menu readable, every `-v` adds detail, 3 traces every crate.
pub fn setup_logging() -> color_eyre::Result<()> {
    let filter = EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env()?;

    let mut verbosity = args().verbose;
    if verbosity > 3 {
        warn!("Verbosity level {verbosity} is too high, defaulting to max of 3");
        verbosity = 3;
    }

    if verbosity == 0 {
        let fmt_layer = fmt::layer()
            .event_format(fmt::format().without_time().compact().with_target(false).with_level(true));
        tracing_subscriber::registry().with(filter).with(fmt_layer).init();
        return Ok(());
    }

    let filter = match verbosity {
        1 => filter.add_directive("browsers_manager=debug".parse()?),
        2 => filter.add_directive("browsers_manager=trace".parse()?),
        _ => EnvFilter::builder().with_default_directive(LevelFilter::TRACE.into()).from_env()?
    };

    let fmt_layer = fmt::layer()
        .without_time()
        .with_target(true)
        .with_file(true)
        .with_line_number(verbosity >= 2)
        .with_thread_ids(verbosity >= 3)
        .with_thread_names(verbosity >= 3)
        .with_level(true);

    tracing_subscriber::registry().with(filter).with(fmt_layer).init();
    Ok(())
}
