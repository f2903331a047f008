//! Line-oriented terminal front end for the exam player.

mod command;
mod render;

use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::mpsc;

use crate::core::config::Settings;
use crate::services::exam_player::{ExamPlayer, PlayerEvent, SubmitError};
use crate::services::grading_client::{GradingService, HttpGradingClient};
use crate::services::session_launcher::{self, LaunchedSession};
use crate::session::errors::SessionError;
use crate::session::submission::SubmissionReceipt;
use crate::session::SessionPhase;

use command::{Command, HELP};

#[derive(Debug, Parser)]
#[command(name = "exam-player", version, about = "Take a timed multiple-choice exam")]
pub(crate) struct Args {
    /// Exam to load from the grading service.
    #[arg(value_name = "EXAM_ID", env = "EXAM_ID")]
    pub(crate) exam_id: String,
    /// Fixed shuffle seed, for reproducing a presentation order.
    #[arg(long, value_name = "N")]
    pub(crate) seed: Option<u64>,
}

type Input = Lines<BufReader<Stdin>>;

enum Flow {
    Continue,
    Exit,
}

pub(crate) async fn run(args: Args, settings: Settings) -> anyhow::Result<()> {
    let settings = settings.with_shuffle_seed(args.seed);
    let client: Arc<dyn GradingService> = Arc::new(HttpGradingClient::from_settings(&settings)?);
    let mut input = BufReader::new(tokio::io::stdin()).lines();

    let launched = load(client.as_ref(), &args.exam_id, &settings, &mut input).await?;
    let Some(launched) = launched else {
        return Ok(());
    };

    println!("{}", render::intro(&launched.intro));
    let (player, mut events) = ExamPlayer::new(launched.session, client, settings.session());
    play(&player, &mut events, &mut input).await
}

/// Repeats the launch until it succeeds or the student gives up.
async fn load(
    client: &dyn GradingService,
    exam_id: &str,
    settings: &Settings,
    input: &mut Input,
) -> anyhow::Result<Option<LaunchedSession>> {
    loop {
        match session_launcher::launch(client, exam_id, settings.session().shuffle_seed).await {
            Ok(launched) => return Ok(Some(launched)),
            Err(err) => {
                tracing::warn!(exam_id, error = %err, "Exam launch failed");
                println!("{err}. Type 'retry' to try again or 'exit' to leave.");
            }
        }

        loop {
            let line = tokio::select! {
                line = input.next_line() => line?,
                _ = crate::core::shutdown::shutdown_signal() => None,
            };
            let Some(line) = line else {
                return Ok(None);
            };
            match command::parse(&line) {
                Ok(Command::Retry) => break,
                Ok(Command::Exit) => return Ok(None),
                Ok(Command::Help) => println!("{HELP}"),
                Ok(_) => println!("The exam is not loaded. Type 'retry' or 'exit'."),
                Err(err) => println!("{err}"),
            }
        }
    }
}

async fn play(
    player: &ExamPlayer,
    events: &mut mpsc::UnboundedReceiver<PlayerEvent>,
    input: &mut Input,
) -> anyhow::Result<()> {
    let shutdown = crate::core::shutdown::shutdown_signal();
    tokio::pin!(shutdown);
    let mut input_closed = false;

    loop {
        tokio::select! {
            line = input.next_line(), if !input_closed => {
                let Some(line) = line? else {
                    // End of input is an exit request; it waits for a pending submission.
                    if leave(player).await {
                        return Ok(());
                    }
                    input_closed = true;
                    continue;
                };
                match command::parse(&line) {
                    Ok(command) => {
                        if let Flow::Exit = handle(player, command).await {
                            return Ok(());
                        }
                    }
                    Err(err) => println!("{err}"),
                }
            }
            Some(event) = events.recv() => {
                println!("{}", render::event(&event));
                let settled =
                    matches!(event, PlayerEvent::Submitted(_) | PlayerEvent::SubmissionFailed(_));
                if input_closed && settled && leave(player).await {
                    return Ok(());
                }
            }
            _ = &mut shutdown => {
                if leave(player).await {
                    return Ok(());
                }
                shutdown.set(crate::core::shutdown::shutdown_signal());
            }
        }
    }
}

async fn leave(player: &ExamPlayer) -> bool {
    match player.exit().await {
        Ok(()) => {
            println!("Goodbye.");
            true
        }
        Err(err) => {
            println!("Cannot leave yet: {err}.");
            false
        }
    }
}

async fn handle(player: &ExamPlayer, command: Command) -> Flow {
    let phase = player.inspect(|session| session.phase()).await;
    if phase == SessionPhase::Intro
        && !matches!(command, Command::Start | Command::Help | Command::History | Command::Exit)
    {
        println!("The exam has not started. Type 'start' when you are ready.");
        return Flow::Continue;
    }

    let outcome = match command {
        Command::Start => match player.start().await {
            Ok(()) => {
                show(player).await;
                Ok(())
            }
            Err(err) => Err(err),
        },
        Command::Show => {
            show(player).await;
            Ok(())
        }
        Command::Next => navigate(player, player.next().await).await,
        Command::Prev => navigate(player, player.previous().await).await,
        Command::Goto(index) => navigate(player, player.go_to(index).await).await,
        Command::Select(option) => select(player, option).await,
        Command::Clear => match active_id(player).await {
            Some(id) => player.clear_response(&id).await.map(|status| {
                println!("Cleared. Question is now {status}.");
            }),
            None => Ok(()),
        },
        Command::Mark => match active_id(player).await {
            Some(id) => player.mark_for_review(&id).await.map(|status| {
                println!("Question is now {status}.");
            }),
            None => Ok(()),
        },
        Command::Pause => player.pause().await.map(|()| println!("Clock paused.")),
        Command::Resume => player.resume().await.map(|()| println!("Clock running.")),
        Command::Status => {
            println!("{}", render::status(&player.snapshot().await));
            Ok(())
        }
        Command::Submit => {
            player.request_submit().await.map(|summary| println!("{}", render::summary(&summary)))
        }
        Command::Cancel => player.cancel_submit().await.map(|()| println!("Back to the exam.")),
        Command::Confirm => submitted(player.confirm_submit().await),
        Command::Retry => submitted(player.retry_submission().await),
        Command::History => {
            match player.history().await {
                Ok(history) => println!("{}", render::history(&history)),
                Err(err) => println!("Could not load your attempts: {err}. Try 'history' again."),
            }
            Ok(())
        }
        Command::Exit => {
            return if leave(player).await { Flow::Exit } else { Flow::Continue };
        }
        Command::Help => {
            println!("{HELP}");
            Ok(())
        }
    };

    if let Err(err) = outcome {
        println!("{err}.");
    }
    Flow::Continue
}

async fn show(player: &ExamPlayer) {
    let text = player
        .inspect(|session| {
            session.active_question().map(|view| {
                render::question(&view, session.exam().len(), session.remaining_seconds())
            })
        })
        .await;
    if let Some(text) = text {
        println!("{text}");
    }
}

async fn navigate(
    player: &ExamPlayer,
    moved: Result<usize, SessionError>,
) -> Result<(), SessionError> {
    moved?;
    show(player).await;
    Ok(())
}

async fn active_id(player: &ExamPlayer) -> Option<String> {
    player
        .inspect(|session| session.active_question().map(|view| view.question.id.clone()))
        .await
}

async fn select(player: &ExamPlayer, option: usize) -> Result<(), SessionError> {
    let target = player
        .inspect(|session| {
            session.active_question().map(|view| {
                let text = view.question.options.get(option).map(|choice| choice.text.clone());
                (view.question.id.clone(), text, view.question.options.len())
            })
        })
        .await;

    let Some((question_id, text, count)) = target else {
        return Ok(());
    };
    let Some(text) = text else {
        return Err(SessionError::OptionOutOfRange { question_id, index: option, count });
    };

    let entry = player.select_option(&question_id, option, &text).await?;
    println!("Selected {}. {}", entry.displayed_index + 1, entry.text);
    Ok(())
}

fn submitted(result: Result<SubmissionReceipt, SubmitError>) -> Result<(), SessionError> {
    match result {
        // The receipt or failure is also announced through the event channel.
        Ok(_) | Err(SubmitError::Failed(_)) => Ok(()),
        Err(SubmitError::InFlight) => {
            println!("A submission is already on its way.");
            Ok(())
        }
        Err(SubmitError::Session(err)) => Err(err),
    }
}
