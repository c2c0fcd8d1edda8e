//! Full flow against a running backend.
//!
//! Requires ADVENTURE_BACKEND_URL to be set (via .env file or environment).
//! Run with: `cargo test -p adventure-core --test live_backend -- --ignored --nocapture`

use adventure_core::{Applied, DraftField, HeadlessGame, Step, Trigger, View};

/// Load environment variables from .env file
fn setup() {
    let _ = dotenvy::dotenv();
}

fn has_backend() -> bool {
    std::env::var("ADVENTURE_BACKEND_URL").is_ok()
}

#[tokio::test]
#[ignore]
async fn test_create_character_and_play_two_turns() {
    setup();
    if !has_backend() {
        eprintln!("Skipping test: ADVENTURE_BACKEND_URL not set");
        return;
    }

    let mut game = HeadlessGame::from_env().expect("Failed to configure backend");

    let step = game.trigger(Trigger::Begin).await.unwrap();
    assert_eq!(step, Step::Settled(Applied::Committed));
    let options = game.machine().options().clone();
    println!("Options: {options:?}");
    assert!(!options.races.is_empty());

    game.set_field(DraftField::Name, "Thorin").unwrap();
    game.set_field(DraftField::Race, options.races[0].clone()).unwrap();
    game.set_field(DraftField::CharacterClass, options.classes[0].clone())
        .unwrap();
    game.set_field(DraftField::Background, options.backgrounds[0].clone())
        .unwrap();

    game.trigger(Trigger::Submit).await.unwrap();
    assert_eq!(game.machine().view(), View::CharacterSheet);
    let character = game.machine().character().unwrap();
    println!("Created {} ({} HP)", character.name, character.hit_points);
    assert!(character.level >= 1);
    assert!(character.hit_points > 0);

    game.trigger(Trigger::BeginAdventure).await.unwrap();
    assert_eq!(game.machine().view(), View::Game);
    let story = game.machine().story().unwrap();
    println!("\n{}\n", story.story_text);
    assert!(!story.story_text.is_empty());

    if !story.choices.is_empty() {
        let step = game.trigger(Trigger::ChooseNumber(1)).await.unwrap();
        assert_eq!(step, Step::Settled(Applied::Committed));
        println!("{}", game.machine().story().unwrap().story_text);
    }

    game.trigger(Trigger::Journal).await.unwrap();
    let history = game.machine().history().unwrap();
    assert!(!history.story_history.is_empty());

    game.trigger(Trigger::Reset).await.unwrap();
    assert_eq!(game.machine().view(), View::Home);
}
