mod artifact;
mod cli;
mod config;
mod conversation;
mod creations;
mod logging;
mod preview;
mod router;
mod session;
mod ui;


use crate::cli::Args;
use crate::config::{resolve_model, MODEL_CATALOG};
use crate::preview::PreviewSurface;
use crate::router::TurnOutcome;
use crate::session::Session;
use crate::ui::commands::{help_text, mime_type_for, parse_command, Command};
use crate::ui::terminal::{TerminalInput, TerminalObserver};
use anyhow::{Context, Result};
use llm::InlineData;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::setup_logging(args.verbose, args.log_file.clone());

    let mut session = Session::new(args.provider_config());
    let surface = Arc::new(PreviewSurface::new(
        args.preview_dir
            .clone()
            .unwrap_or_else(PreviewSurface::default_dir),
        args.open_preview,
    ));
    session.add_observer(Arc::new(TerminalObserver::new()));
    session.add_observer(surface.clone());

    if !args.no_probe {
        session.probe_local_models().await;
    }

    match args.prompt {
        Some(prompt) => {
            let Some(summary) = session.send(&prompt, None).await else {
                return Ok(());
            };
            if let Some(creation) = &summary.creation {
                println!("Preview written to {}", surface.path_for(creation).display());
            }
            if summary.outcome == TurnOutcome::Failed {
                std::process::exit(1);
            }
            Ok(())
        }
        None => run_repl(session).await,
    }
}

async fn run_repl(mut session: Session) -> Result<()> {
    let mut input = TerminalInput::new()?;
    let mut attachment: Option<InlineData> = None;

    println!("CodeMax Architect. Type /help for commands.");

    while let Some(line) = input.read_line()? {
        if line.is_empty() && attachment.is_none() {
            continue;
        }

        match parse_command(&line) {
            Command::Prompt(prompt) => {
                session.send(&prompt, attachment.take()).await;
            }
            Command::Help => println!("{}", help_text()),
            Command::ListModels => print_models(&session),
            Command::SwitchModel(model) => {
                session.set_model(model);
                println!(
                    "Using {} ({})",
                    session.config().model,
                    resolve_model(&session.config().model)
                );
            }
            Command::SetLocalUrl(url) => {
                session.set_local_url(url);
                let models = session.probe_local_models().await;
                if models.is_available() {
                    println!("Local daemon serves {} models", models.names().len());
                } else {
                    println!("Local daemon is unreachable; using the cloud");
                }
            }
            Command::NewChat => {
                session.new_chat();
                attachment = None;
                println!("Started a new chat");
            }
            Command::History => print_history(&session),
            Command::Select(n) => {
                let id = session
                    .creations()
                    .entries()
                    .get(n - 1)
                    .map(|creation| creation.id.clone());
                match id {
                    Some(id) => {
                        session.select_creation(&id);
                    }
                    None => println!("No creation #{}", n),
                }
            }
            Command::PreviewTurn(turn) => {
                if session.conversation().is_empty() {
                    println!("No turns yet");
                } else if session.preview_turn(turn - 1).is_none() {
                    println!(
                        "Turn {} of {} is not a model turn with a complete HTML document",
                        turn,
                        session.conversation().messages().len()
                    );
                }
            }
            Command::Verify => {
                if session.verify_active().await.is_none() {
                    println!("Nothing to verify: no active creation");
                }
            }
            Command::Attach(path) => match load_attachment(&path) {
                Ok(data) => {
                    println!("Attached {} ({})", path.display(), data.mime_type);
                    attachment = Some(data);
                }
                Err(e) => println!("{:#}", e),
            },
            Command::Quit => break,
            Command::Invalid(message) => println!("{}", message),
        }
    }

    debug!("Leaving REPL");
    Ok(())
}

fn print_models(session: &Session) {
    println!("Catalog:");
    for alias in MODEL_CATALOG {
        let marker = if alias.id.eq_ignore_ascii_case(&session.config().model) {
            "*"
        } else {
            " "
        };
        println!("{} {:<14} {}", marker, alias.label(), alias.model);
    }

    let local = session.local_models();
    if local.is_available() {
        println!("Local ({}):", session.config().local_url);
        for name in local.names() {
            println!("  {}", name);
        }
    } else {
        println!("Local daemon not connected");
    }
}

fn print_history(session: &Session) {
    let creations = session.creations();
    if creations.is_empty() {
        println!("No creations yet");
        return;
    }
    let active_id = session.active_creation().map(|c| c.id.as_str());
    for (i, creation) in creations.entries().iter().enumerate() {
        let marker = if Some(creation.id.as_str()) == active_id {
            "*"
        } else {
            " "
        };
        println!(
            "{}{:>3}. {}  {}",
            marker,
            i + 1,
            creation.name,
            creation.timestamp.format("%H:%M:%S")
        );
    }
}

fn load_attachment(path: &Path) -> Result<InlineData> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read attachment {:?}", path))?;
    Ok(InlineData::from_bytes(mime_type_for(path), &bytes))
}
