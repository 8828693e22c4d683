use clap::Parser;
use cs_client::{ChannelCommandSink, CommandSink};
use cs_skill::{SkillRequest, SkillResponse};
use futures::{AsyncWriteExt, FutureExt};
use rustyline_async::{Readline, ReadlineEvent, SharedWriter};
use tokio::select;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[clap(no_binary_name = true)]
#[clap(rename_all = "kebab-case")]
enum Commands {
    #[clap(subcommand)]
    Skill(SkillRequest),
    Exit,
}

fn parse_line(line: &str) -> Result<Commands, clap::Error> {
    Parser::try_parse_from(line.split_ascii_whitespace())
}

pub async fn run_interactive_cli(
    mut editor: Readline,
    mut stdout: SharedWriter,
    skill_cmd_tx: ChannelCommandSink<SkillRequest, SkillResponse>,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    loop {
        select! {
            _ = cancellation_token.cancelled() => {
                break;
            }
            result = editor.readline().fuse() => {
                let line = match result {
                    Ok(ReadlineEvent::Line(line)) => line,
                    // the editor holds the terminal in raw mode, so ctrl+c
                    // arrives here instead of as a signal
                    Ok(ReadlineEvent::Interrupted) => {
                        info!("received interrupt, shutting down");
                        cancellation_token.cancel();
                        break;
                    }
                    Ok(ReadlineEvent::Eof) => {
                        debug!("input closed, interactive cli exiting");
                        break;
                    }
                    Err(err) => {
                        error!("interactive error: {:#?}", err);
                        break;
                    }
                };

                if line.trim().is_empty() {
                    continue;
                }

                stdout.write_all(format!("cs> {}\n", line).as_bytes()).await?;

                let request = match parse_line(&line) {
                    Ok(request) => request,
                    Err(err) => {
                        stdout.write_all(err.to_string().as_bytes()).await?;
                        continue;
                    }
                };

                editor.add_history_entry(line);

                match request {
                    Commands::Skill(request) => match skill_cmd_tx.command(request).await {
                        Ok(response) => info!("{:?}", response),
                        Err(err) => error!("{:?}", err),
                    },
                    Commands::Exit => {
                        info!("exiting");
                        cancellation_token.cancel();
                    }
                }
            }
        }
    }

    Ok(())
}
