use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Where log lines go for the lifetime of the process.
pub enum LogSink<'a> {
    Stderr,
    File(&'a Path),
    Discard,
}

pub fn init(sink: LogSink<'_>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match sink {
        LogSink::Stderr => registry.with(fmt::layer().with_writer(std::io::stderr)).try_init()?,
        LogSink::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .try_init()?
        }
        LogSink::Discard => registry.with(fmt::layer().with_writer(std::io::sink)).try_init()?,
    }

    Ok(())
}
