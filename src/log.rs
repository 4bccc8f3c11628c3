//! Console logging.
//!
//! canopy logs through `tracing` with a handful of fixed targets:
//!
//! | Target   | Events                                        |
//! |----------|-----------------------------------------------|
//! | `server` | bind, URLs, shutdown                          |
//! | `routes` | one line per registered route, load failures  |
//! | `http`   | one line per request                          |
//! | `ws`     | connect, sent messages, close, rejections     |
//!
//! [`init`] installs a subscriber that prints them as
//!
//! ```text
//! [14:03:12] INFO  ws     connected conn=1 peer=127.0.0.1:53122 path=/users
//! ```
//!
//! with the level colored by severity when the terminal supports it.
//! `RUST_LOG` filters as usual; the default is `info`.

use std::fmt;

use console::{Style, style};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::Result;

/// Installs the global console subscriber.
pub fn init() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(console::colors_enabled())
                .event_format(Console),
        )
        .try_init()?;
    Ok(())
}

/// Event format: `[time] LEVEL target fields`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Console;

impl<S, N> FormatEvent<S, N> for Console
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let ansi = writer.has_ansi_escapes();
        let meta = event.metadata();

        let time = chrono::Local::now().format("%H:%M:%S");
        write!(writer, "{} ", style(format!("[{time}]")).dim().force_styling(ansi))?;

        let level = level_style(*meta.level()).apply_to(format!("{:<5}", meta.level().as_str()));
        write!(writer, "{} ", level.force_styling(ansi))?;

        let target = style(format!("{:<6}", meta.target())).cyan().force_styling(ansi);
        write!(writer, "{target} ")?;

        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

fn level_style(level: Level) -> Style {
    match level {
        Level::ERROR => Style::new().red().bold(),
        Level::WARN => Style::new().yellow(),
        Level::INFO => Style::new().green(),
        Level::DEBUG => Style::new().blue(),
        Level::TRACE => Style::new().magenta(),
    }
}
