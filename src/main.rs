use std::{fs::File, process::ExitCode};

use anyhow::{Result, anyhow};
use clap::Parser;
use daemonize::Daemonize;
use log::{LevelFilter, error, info, warn};
use syslog::{BasicLogger, Facility, Formatter3164};

use orientd::{application::Application, cli::Cli, config::Config, shutdown::StopFlag};

const DAEMON_LOG: &str = "/var/tmp/orientd.log";

fn log_level(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn init_log(cli: &Cli) -> Result<()> {
    let level = log_level(cli.verbose);
    if cli.syslog || cli.daemonize {
        return syslog::unix(Formatter3164 {
            facility: Facility::LOG_DAEMON,
            hostname: None,
            process: "orientd".into(),
            pid: std::process::id(),
        })
        .map_err(|e| anyhow!("{e}"))
        .and_then(|logger| {
            log::set_boxed_logger(Box::new(BasicLogger::new(logger)))
                .map(|()| log::set_max_level(level))
                .map_err(|e| anyhow!("{e}"))
        });
    }

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init()
        .map_err(|e| anyhow!("{e}"))
}

fn into_daemon() -> Result<()> {
    File::create(DAEMON_LOG)
        .and_then(|out| Ok((out.try_clone()?, out)))
        .map_err(|e| anyhow!("{e}"))
        .and_then(|(stderr, stdout)| {
            Daemonize::new()
                .stdout(stdout)
                .stderr(stderr)
                .start()
                .map_err(|e| anyhow!("{e}"))
        })
}

fn run(config: Config, stop: StopFlag) -> Result<bool> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let exit = runtime.block_on(
        Application::builder()
            .with_config(config)
            .with_stop_flag(stop)
            .build()?
            .run(),
    )?;

    if !exit.is_graceful() {
        warn!("Exiting after {exit:?}");
    }
    Ok(exit.is_graceful())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = Config::from_cli(&cli).and_then(|config| {
        if cli.daemonize {
            into_daemon()?;
        }
        // After forking, so syslog carries the daemon's pid.
        if let Err(e) = init_log(&cli) {
            eprintln!("warning: logging unavailable: {e}");
        }
        info!("orientd {} starting", env!("CARGO_PKG_VERSION"));
        run(config, StopFlag::install()?)
    });

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("{e:#}");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
