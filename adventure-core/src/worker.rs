//! Background execution of machine commands.
//!
//! The UI loop sends [`WorkerRequest`]s and drains [`Completion`]s between
//! frames. Each command runs on its own task so a slow story request does not
//! hold up an options fetch or a journal lookup.

use crate::backend::StoryBackend;
use crate::machine::{Command, Completion, Outcome, Request};
use crate::options::CharacterOptionsCache;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Request sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerRequest {
    /// Execute a command from the state machine.
    Execute(Command),
    /// Stop accepting work.
    Shutdown,
}

/// Run one command against the backend and wrap the result for the machine.
pub async fn execute(
    backend: &dyn StoryBackend,
    options: &CharacterOptionsCache,
    command: Command,
) -> Completion {
    let Command { tag, request } = command;
    debug!(%tag, ?request, "Executing request");

    let outcome = match request {
        Request::FetchOptions => Outcome::Options(options.fetch().await),
        Request::CreateCharacter(character) => {
            Outcome::CharacterCreated(backend.create_character(&character).await)
        }
        Request::StartAdventure { character_id } => {
            Outcome::AdventureStarted(backend.start_adventure(&character_id).await)
        }
        Request::SubmitChoice {
            session_id,
            choice_text,
        } => Outcome::ChoiceResolved(backend.submit_choice(&session_id, &choice_text).await),
        Request::FetchHistory { session_id } => {
            Outcome::History(backend.story_history(&session_id).await)
        }
    };

    Completion { tag, outcome }
}

/// Spawn the request worker on the current tokio runtime and return its
/// channel endpoints.
pub fn spawn_worker(
    backend: Arc<dyn StoryBackend>,
    options: Arc<CharacterOptionsCache>,
) -> (mpsc::Sender<WorkerRequest>, mpsc::Receiver<Completion>) {
    let (request_tx, request_rx) = mpsc::channel(8);
    let (completion_tx, completion_rx) = mpsc::channel(64);

    tokio::spawn(worker_loop(backend, options, request_rx, completion_tx));

    (request_tx, completion_rx)
}

async fn worker_loop(
    backend: Arc<dyn StoryBackend>,
    options: Arc<CharacterOptionsCache>,
    mut request_rx: mpsc::Receiver<WorkerRequest>,
    completion_tx: mpsc::Sender<Completion>,
) {
    loop {
        match request_rx.recv().await {
            Some(WorkerRequest::Execute(command)) => {
                let backend = Arc::clone(&backend);
                let options = Arc::clone(&options);
                let completion_tx = completion_tx.clone();
                tokio::spawn(async move {
                    let completion = execute(backend.as_ref(), &options, command).await;
                    if let Err(e) = completion_tx.send(completion).await {
                        warn!(tag = %e.0.tag, "Completion dropped, UI is gone");
                    }
                });
            }
            Some(WorkerRequest::Shutdown) | None => {
                info!("Request worker stopped");
                break;
            }
        }
    }
}
