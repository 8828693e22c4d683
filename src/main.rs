use anyhow::Context;
use clap::Parser;
use cs_camera::CameraSkill;
use rustyline_async::{Readline, SharedWriter};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::metadata::LevelFilter;
use tracing_subscriber::{
    filter::Targets, fmt::writer::BoxMakeWriter, layer::SubscriberExt, util::SubscriberInitExt,
    Layer,
};

use crate::cli::interactive::run_interactive_cli;

#[macro_use]
extern crate tracing;

mod cli;
mod config;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    // setup colorful backtraces
    color_backtrace::install();

    let main_args: cli::args::MainArgs = cli::args::MainArgs::parse();

    // the line editor owns the terminal, so console logs go through it
    let (console, editor) = if main_args.interactive {
        let (editor, stdout) =
            Readline::new("cs> ".into()).context("failed to create interactive editor")?;
        let writer = BoxMakeWriter::new({
            let stdout = stdout.clone();
            move || stdout.clone()
        });
        (writer, Some((editor, stdout)))
    } else {
        (BoxMakeWriter::new(std::io::stdout), None)
    };

    let targets = match std::env::var("RUST_LOG") {
        Ok(directives) => parse_targets(&directives)?,
        Err(_) => Targets::new().with_default(LevelFilter::INFO),
    };

    let (writer, _guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::hourly("logs", "camera-skill"));

    tracing_subscriber::registry()
        // writer that outputs to console
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(console)
                .with_filter(targets),
        )
        // writer that outputs to files
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(Targets::new().with_targets(vec![
                    ("camera_skill", LevelFilter::DEBUG),
                    ("cs_bus", LevelFilter::DEBUG),
                    ("cs_skill", LevelFilter::DEBUG),
                    ("cs_camera", LevelFilter::DEBUG),
                ])),
        )
        .init();

    debug!("reading config from {:?}", &main_args.config);
    let config = crate::config::CameraSkillConfig::read_from_path(&main_args.config)
        .context("failed to read config file")?;

    run_tasks(config, editor).await
}

/// Parses `RUST_LOG`-style directives: `level` sets the default,
/// `target=level` sets one target.
fn parse_targets(directives: &str) -> anyhow::Result<Targets> {
    let mut targets = Targets::new();

    for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        if let Some((target, level)) = directive.split_once('=') {
            targets = targets.with_target(
                target,
                level.parse::<LevelFilter>().context("invalid log level")?,
            );
        } else {
            targets = targets.with_default(
                directive
                    .parse::<LevelFilter>()
                    .context("invalid log level")?,
            );
        }
    }

    Ok(targets)
}

async fn run_tasks(
    config: crate::config::CameraSkillConfig,
    editor: Option<(Readline, SharedWriter)>,
) -> anyhow::Result<()> {
    let cancellation_token = CancellationToken::new();

    ctrlc::set_handler({
        let cancellation_token = cancellation_token.clone();
        move || {
            info!("received interrupt, shutting down");
            cancellation_token.cancel();
        }
    })
    .context("could not set ctrl+c handler")?;

    let mut tasks = Vec::<Box<dyn cs_client::Task>>::new();

    debug!("initializing bus task");
    let bus_task = cs_bus::create_task(config.bus).context("failed to initialize bus task")?;
    let emitter = bus_task.emitter();
    let bus_evt_rx = bus_task.events();
    tasks.push(Box::new(bus_task));

    debug!("initializing camera skill task");
    let skill_task = cs_skill::create_task(
        CameraSkill::new(config.camera),
        config.skill,
        emitter,
        bus_evt_rx,
    )
    .context("failed to initialize camera skill")?;
    let skill_cmd_tx = skill_task.cmd();
    tasks.push(Box::new(skill_task));

    let mut join_set = JoinSet::new();

    if let Some((editor, stdout)) = editor {
        join_set.spawn(run_interactive_cli(
            editor,
            stdout,
            skill_cmd_tx,
            cancellation_token.clone(),
        ));
    }

    for task in tasks {
        debug!("starting {} task", task.name());
        join_set.spawn(task.run(cancellation_token.clone()));
    }

    while let Some(res) = join_set.join_next().await {
        // if task panicked, then will be Some(Err)
        // if task terminated w/ error, then will be Some(Ok(Err))
        // need to propagate errors in both cases

        match res {
            Err(err) => {
                cancellation_token.cancel();
                return Err(err).context("task failed");
            }
            Ok(Err(err)) => {
                cancellation_token.cancel();
                return Err(err).context("task terminated with error");
            }
            _ => {
                info!("exited task");
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tracing::Level;

    use super::*;

    #[test]
    fn parses_default_and_per_target_levels() {
        let targets = parse_targets("warn, cs_bus=trace").unwrap();

        assert!(targets.would_enable("cs_bus", &Level::TRACE));
        assert!(targets.would_enable("cs_camera", &Level::WARN));
        assert!(!targets.would_enable("cs_camera", &Level::INFO));
    }

    #[test]
    fn rejects_bad_level() {
        assert!(parse_targets("cs_bus=loud").is_err());
    }
}
