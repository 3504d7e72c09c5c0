use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::config::{Config, LogConfig};
use crate::dispatcher::Dispatcher;
use crate::exec::DdcutilRunner;
use crate::monitor::MonitorController;

#[macro_use]
extern crate tracing;

mod config;
mod dispatcher;
mod error;
mod exec;
mod keypad;
mod monitor;
mod preflight;

fn setup_logs(log: &LogConfig) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log.filter.clone()));
    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let file_layer = log.file.as_ref().and_then(|path| {
        match std::fs::OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            ),
            Err(err) => {
                eprintln!("cannot open log file {}: {err}", path.display());
                None
            }
        }
    });

    if let Ok(journal_layer) = tracing_journald::layer() {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(console_layer)
            .with(file_layer)
            .with(journal_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(console_layer)
            .with(file_layer)
            .init();
    }
}

fn main() -> ExitCode {
    let (config, config_source) = match Config::load() {
        Ok(loaded) => loaded,
        Err(err) => {
            setup_logs(&LogConfig::default());
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };
    setup_logs(&config.log);
    match &config_source {
        Some(path) => info!("configuration loaded from {}", path.display()),
        None => info!("no configuration file found, using defaults"),
    }

    let bindings = match keypad::resolve_bindings(&config.keypad.bindings) {
        Ok(bindings) => bindings,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    preflight::report(&preflight::check_environment(config.monitor.bus));

    let runner = DdcutilRunner::default();
    runner.probe();
    let mut controller = MonitorController::new(runner, &config.monitor);

    let (mut device, _path) = match keypad::locate(&config.keypad) {
        Ok(found) => found,
        Err(err) => {
            error!("{err}");
            return ExitCode::FAILURE;
        }
    };

    match controller.refresh_current_input() {
        Some(input) => info!("monitor currently on {input}"),
        None => info!("monitor input state unknown"),
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    for signal in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
        if let Err(err) = signal_hook::flag::register(signal, Arc::clone(&shutdown)) {
            error!("failed to install signal handler: {err}");
            return ExitCode::FAILURE;
        }
    }

    let mut dispatcher = Dispatcher::new(controller, bindings, config.behavior.on_press, shutdown);
    match dispatcher.run(&mut device) {
        Ok(()) => {
            info!("shut down cleanly");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("event loop failed: {err}");
            ExitCode::FAILURE
        }
    }
}
