use std::{env, io, process};

use gridstage::cli::{output, Dispatcher};
use gridstage::config::Settings;
use gridstage::exitcode;
use gridstage::infrastructure::di::ServiceContainer;
use tracing::debug;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

fn main() {
    setup_logging();

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            output::error(&e);
            eprintln!("\nExpected settings layout:\n\n{}", Settings::template());
            process::exit(exitcode::UNEXPECTED);
        }
    };
    match settings.to_toml() {
        Ok(toml) => debug!("effective settings:\n{}", toml),
        Err(e) => debug!("cannot render settings: {}", e),
    }

    let args: Vec<String> = env::args_os()
        .skip(1)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();

    let dispatcher = Dispatcher::new(ServiceContainer::new(settings));
    let outcome = dispatcher.run(&args, &mut io::stdout(), &mut io::stderr());
    debug!("exit: {:?}", outcome);
    process::exit(outcome.code());
}

fn setup_logging() {
    // stdout carries the [gridstage] lines; logs go to stderr
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let fmt_layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(fmt_layer.with_filter(env_filter))
        .init();
}
