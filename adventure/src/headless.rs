//! Headless mode for the adventure client.
//!
//! A line-oriented front end over [`HeadlessGame`], for scripting and smoke
//! tests against a live backend. Every request settles before the next line
//! is read.

use adventure_core::{
    DraftField, HeadlessGame, NoticeKind, Rejection, Step, StoryBackend, Trigger, View,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Trigger(Trigger),
    SetField(DraftField, String),
    Status,
    Help,
    Quit,
    Unknown(String),
}

/// Parse a line. Bare text in the game view is a choice; a bare number picks
/// a listed choice.
pub fn parse_line(line: &str, view: View) -> Input {
    let line = line.trim();

    let Some(command) = line.strip_prefix('#') else {
        if view != View::Game {
            return Input::Unknown(line.to_string());
        }
        return match line.parse::<usize>() {
            Ok(number) => Input::Trigger(Trigger::ChooseNumber(number)),
            Err(_) => Input::Trigger(Trigger::Choose(line.to_string())),
        };
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };

    let field = match name {
        "name" => Some(DraftField::Name),
        "race" => Some(DraftField::Race),
        "class" => Some(DraftField::CharacterClass),
        "background" => Some(DraftField::Background),
        _ => None,
    };
    if let Some(field) = field {
        return Input::SetField(field, rest.to_string());
    }

    match name {
        "begin" => Input::Trigger(Trigger::Begin),
        "back" => Input::Trigger(Trigger::Back),
        "submit" => Input::Trigger(Trigger::Submit),
        "edit" => Input::Trigger(Trigger::Edit),
        "start" => Input::Trigger(Trigger::BeginAdventure),
        "retry" => Input::Trigger(Trigger::RetryOptions),
        "journal" => Input::Trigger(Trigger::Journal),
        "reset" => Input::Trigger(Trigger::Reset),
        "status" => Input::Status,
        "help" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => Input::Unknown(format!("#{other}")),
    }
}

/// Run the game in headless mode.
///
/// This provides a simple line-oriented protocol:
/// - Lines starting with `#` are commands (see `#help`)
/// - In the game view, any other line is a choice
pub async fn run_headless(backend: Arc<dyn StoryBackend>) -> io::Result<()> {
    let mut game = HeadlessGame::new(backend);
    let mut stdout = io::stdout();

    println!("=== Narrative Adventure Headless Mode ===");
    print_help();
    println!();
    print_view(&game);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                eprintln!("Error reading input: {e}");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(&line, game.machine().view()) {
            Input::Quit => {
                println!("Goodbye!");
                break;
            }
            Input::Help => print_help(),
            Input::Status => print_status(&game),
            Input::Unknown(text) => {
                println!("[ERROR] Unknown command '{text}'. Type #help for help.");
            }
            Input::SetField(field, value) => match game.set_field(field, value) {
                Ok(()) => println!("[SET] {}: {}", field.label(), game.machine().draft().get(field)),
                Err(rejection) => print_rejection(&rejection),
            },
            Input::Trigger(trigger) => {
                let view_before = game.machine().view();
                print!("[PROCESSING]");
                stdout.flush().ok();

                let result = game.trigger(trigger).await;
                print!("\r            \r");
                stdout.flush().ok();

                match result {
                    Ok(step) => {
                        print_notice(&mut game);
                        if matches!(step, Step::Settled(_)) || game.machine().view() != view_before
                        {
                            print_view(&game);
                        }
                    }
                    Err(Rejection::Validation(_)) => print_notice(&mut game),
                    Err(rejection) => print_rejection(&rejection),
                }
            }
        }
        stdout.flush().ok();
    }

    Ok(())
}

fn print_help() {
    println!("[HELP]");
    println!("  #begin                  - Open character creation");
    println!("  #name|#race|#class|#background <value>");
    println!("                          - Fill in a character field");
    println!("  #submit                 - Create the character");
    println!("  #retry                  - Reload character options");
    println!("  #back                   - Return home from creation");
    println!("  #edit                   - Return to creation from the sheet");
    println!("  #start                  - Begin the adventure");
    println!("  <number> | <text>       - Make a choice (in the game)");
    println!("  #journal                - Show the session journal");
    println!("  #reset                  - Discard everything and go home");
    println!("  #status                 - Show the current state");
    println!("  #quit                   - Exit");
}

fn print_rejection(rejection: &Rejection) {
    println!("[REJECTED] {rejection}");
}

fn print_notice(game: &mut HeadlessGame) {
    if let Some(notice) = game.machine_mut().take_notice() {
        match notice.kind {
            NoticeKind::Validation => println!("[INVALID] {}", notice.message),
            NoticeKind::Failure => println!("[ERROR] {}", notice.message),
        }
    }
}

fn print_view(game: &HeadlessGame) {
    let machine = game.machine();
    println!("[VIEW] {}", machine.view());

    match machine.view() {
        View::Home => println!("Type #begin to create a character."),
        View::CharacterCreation => {
            let options = machine.options();
            if options.is_empty() {
                println!("  (no character options loaded; #retry to try again)");
            } else {
                println!("  Races: {}", options.races.join(", "));
                println!("  Classes: {}", options.classes.join(", "));
                println!("  Backgrounds: {}", options.backgrounds.join(", "));
            }
        }
        View::CharacterSheet => {
            if let Some(character) = machine.character() {
                println!(
                    "  {} - level {} {} {} ({})",
                    character.name,
                    character.level,
                    character.race,
                    character.character_class,
                    character.background
                );
                println!(
                    "  HP: {}  AC: {}  Gold: {}",
                    character.hit_points, character.armor_class, character.gold
                );
                let scores: Vec<String> = character
                    .ability_scores()
                    .iter()
                    .map(|(label, score)| format!("{label} {score}"))
                    .collect();
                println!("  {}", scores.join("  "));
            }
        }
        View::Game => {
            if let Some(history) = machine.history() {
                println!("[JOURNAL] at {}", history.current_location);
                for (i, choice) in history.choices_made.iter().enumerate() {
                    println!("  {}. {choice}", i + 1);
                }
            }
            if let Some(story) = machine.story() {
                if let Some(location) = story.location_name() {
                    println!("[LOCATION] {location}");
                }
                if story.combat_encounter {
                    println!("[COMBAT]");
                }
                println!("[STORY]");
                for para in story.story_text.split("\n\n") {
                    println!("{para}");
                }
                println!();
                for (i, choice) in story.choices.iter().enumerate() {
                    println!("  {}. {choice}", i + 1);
                }
            }
        }
    }
}

fn print_status(game: &HeadlessGame) {
    let machine = game.machine();
    println!("[STATUS]");
    println!("  View: {}", machine.view());
    println!("  Loading: {}", machine.is_loading());
    if let Some(character) = machine.character() {
        println!("  Character: {} ({})", character.name, character.id);
    }
    if let Some(session) = machine.session() {
        println!("  Session: {}", session.session_id);
    }
    if machine.view() == View::CharacterCreation {
        let draft = machine.draft();
        for field in DraftField::ALL {
            println!("  {}: {}", field.label(), draft.get(field));
        }
    }
}
