//! The request worker and the options cache under real concurrency.

use adventure_core::testing::{
    sample_character, sample_options, sample_start, BackendCall, MockBackend,
};
use adventure_core::{
    spawn_worker, Applied, CharacterOptionsCache, Completion, DraftField, Rejection, Trigger,
    View, ViewStateMachine, WorkerRequest,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

async fn next_completion(rx: &mut mpsc::Receiver<Completion>) -> Completion {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("worker did not answer in time")
        .expect("worker channel closed")
}

fn fill_draft(machine: &mut ViewStateMachine) {
    for (field, value) in DraftField::ALL
        .into_iter()
        .zip(["Kael", "Elf", "Rogue", "Orphan"])
    {
        machine.set_draft_field(field, value).unwrap();
    }
}

#[tokio::test]
async fn test_worker_executes_commands() {
    let backend = Arc::new(
        MockBackend::new()
            .with_options(Ok(sample_options()))
            .with_character(Ok(sample_character("c1"))),
    );
    let cache = Arc::new(CharacterOptionsCache::new(backend.clone()));
    let (tx, mut rx) = spawn_worker(backend.clone(), cache.clone());
    let mut machine = ViewStateMachine::new();

    let command = machine.dispatch(Trigger::Begin).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    assert_eq!(machine.complete(next_completion(&mut rx).await), Applied::Committed);
    assert!(cache.current().is_some());

    fill_draft(&mut machine);
    let command = machine.dispatch(Trigger::Submit).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    assert!(machine.is_loading());
    assert_eq!(machine.complete(next_completion(&mut rx).await), Applied::Committed);
    assert_eq!(machine.view(), View::CharacterSheet);
    assert!(!machine.is_loading());

    tx.send(WorkerRequest::Shutdown).await.unwrap();
}

#[tokio::test]
async fn test_completion_after_reset_is_discarded() {
    let backend = Arc::new(
        MockBackend::gated()
            .with_options(Ok(sample_options()))
            .with_character(Ok(sample_character("c1")))
            .with_character(Ok(sample_character("c2")))
            .with_start(Ok(sample_start("s1"))),
    );
    let cache = Arc::new(CharacterOptionsCache::new(backend.clone()));
    let (tx, mut rx) = spawn_worker(backend.clone(), cache);
    let mut machine = ViewStateMachine::new();

    let command = machine.dispatch(Trigger::Begin).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    backend.release(1);
    machine.complete(next_completion(&mut rx).await);

    // Submit, then reset while the backend is still holding the response
    fill_draft(&mut machine);
    let stale = machine.dispatch(Trigger::Submit).unwrap().unwrap();
    let stale_tag = stale.tag;
    tx.send(WorkerRequest::Execute(stale)).await.unwrap();
    machine.dispatch(Trigger::Reset).unwrap();
    assert!(!machine.is_loading());

    // Start over and submit again before the first response lands
    machine.dispatch(Trigger::Begin).unwrap();
    fill_draft(&mut machine);
    let fresh = machine.dispatch(Trigger::Submit).unwrap().unwrap();
    assert!(fresh.tag.epoch > stale_tag.epoch);
    tx.send(WorkerRequest::Execute(fresh)).await.unwrap();

    backend.release(2);
    let first = next_completion(&mut rx).await;
    let second = next_completion(&mut rx).await;

    let mut applied = vec![machine.complete(first), machine.complete(second)];
    applied.sort_by_key(|a| *a == Applied::Stale);
    assert_eq!(applied, vec![Applied::Committed, Applied::Stale]);

    assert_eq!(machine.view(), View::CharacterSheet);
    assert!(!machine.is_loading());
    assert_eq!(
        backend.count(|c| matches!(c, BackendCall::CreateCharacter(_))),
        2
    );
}

#[tokio::test]
async fn test_reset_during_start_does_not_resurrect_session() {
    let backend = Arc::new(
        MockBackend::gated()
            .with_options(Ok(sample_options()))
            .with_character(Ok(sample_character("c1")))
            .with_start(Ok(sample_start("s1"))),
    );
    let cache = Arc::new(CharacterOptionsCache::new(backend.clone()));
    let (tx, mut rx) = spawn_worker(backend.clone(), cache);
    let mut machine = ViewStateMachine::new();

    let command = machine.dispatch(Trigger::Begin).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    backend.release(1);
    machine.complete(next_completion(&mut rx).await);

    fill_draft(&mut machine);
    let command = machine.dispatch(Trigger::Submit).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    backend.release(1);
    machine.complete(next_completion(&mut rx).await);
    assert_eq!(machine.view(), View::CharacterSheet);

    let command = machine.dispatch(Trigger::BeginAdventure).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    machine.dispatch(Trigger::Reset).unwrap();

    backend.release(1);
    assert_eq!(machine.complete(next_completion(&mut rx).await), Applied::Stale);
    assert_eq!(machine.view(), View::Home);
    assert!(machine.character().is_none());
    assert!(machine.session().is_none());
}

#[tokio::test]
async fn test_edit_during_start_does_not_allow_a_second_start() {
    let backend = Arc::new(
        MockBackend::gated()
            .with_options(Ok(sample_options()))
            .with_character(Ok(sample_character("c1")))
            .with_character(Ok(sample_character("c2")))
            .with_start(Ok(sample_start("s1")))
            .with_start(Ok(sample_start("s2"))),
    );
    let cache = Arc::new(CharacterOptionsCache::new(backend.clone()));
    let (tx, mut rx) = spawn_worker(backend.clone(), cache);
    let mut machine = ViewStateMachine::new();
    let starts = || backend.count(|c| matches!(c, BackendCall::StartAdventure(_)));

    let command = machine.dispatch(Trigger::Begin).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    backend.release(1);
    machine.complete(next_completion(&mut rx).await);

    fill_draft(&mut machine);
    let command = machine.dispatch(Trigger::Submit).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    backend.release(1);
    machine.complete(next_completion(&mut rx).await);

    let command = machine.dispatch(Trigger::BeginAdventure).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();

    // Back to the form while the session is still being created
    machine.dispatch(Trigger::Edit).unwrap();
    assert_eq!(machine.view(), View::CharacterCreation);
    assert!(machine.is_loading());
    assert_eq!(machine.dispatch(Trigger::Submit), Err(Rejection::Busy));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(starts(), 1);
    assert_eq!(
        backend.count(|c| matches!(c, BackendCall::CreateCharacter(_))),
        1
    );

    // The first start lands in the wrong view and is dropped
    backend.release(1);
    assert_eq!(machine.complete(next_completion(&mut rx).await), Applied::Stale);
    assert!(!machine.is_loading());
    assert!(machine.session().is_none());

    // Only now can the player go round again
    let command = machine.dispatch(Trigger::Submit).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    backend.release(1);
    machine.complete(next_completion(&mut rx).await);
    assert_eq!(machine.character().map(|c| c.id.as_str()), Some("c2"));

    let command = machine.dispatch(Trigger::BeginAdventure).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    backend.release(1);
    assert_eq!(machine.complete(next_completion(&mut rx).await), Applied::Committed);
    assert_eq!(machine.session().map(|s| s.session_id.as_str()), Some("s2"));
    assert_eq!(starts(), 2);
}

#[tokio::test]
async fn test_concurrent_option_fetches_share_one_request() {
    let backend = Arc::new(MockBackend::gated().with_options(Ok(sample_options())));
    let cache = Arc::new(CharacterOptionsCache::new(backend.clone()));

    let tasks: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.fetch().await })
        })
        .collect();

    // Let every task reach the shared request before answering it
    tokio::time::sleep(Duration::from_millis(50)).await;
    backend.release(1);

    for task in tasks {
        let options = task.await.unwrap().unwrap();
        assert_eq!(options.races, vec!["Human", "Elf"]);
    }
    assert_eq!(
        backend.count(|c| matches!(c, BackendCall::CharacterOptions)),
        1
    );
}

#[tokio::test]
async fn test_worker_keeps_running_when_ui_is_gone() {
    let backend = Arc::new(MockBackend::new().with_options(Ok(sample_options())));
    let cache = Arc::new(CharacterOptionsCache::new(backend.clone()));
    let (tx, rx) = spawn_worker(backend.clone(), cache.clone());
    drop(rx);

    let mut machine = ViewStateMachine::new();
    let command = machine.dispatch(Trigger::Begin).unwrap().unwrap();
    tx.send(WorkerRequest::Execute(command)).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // The request still ran; only its completion had nowhere to go
    assert_eq!(
        backend.count(|c| matches!(c, BackendCall::CharacterOptions)),
        1
    );
    assert!(cache.current().is_some());
    tx.send(WorkerRequest::Shutdown).await.unwrap();
}
