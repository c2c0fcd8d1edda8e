//! Event handling for the adventure TUI

use adventure_core::{DraftField, Trigger, View};
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::app::{App, InputMode};

/// Result of handling an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventResult {
    Continue,
    Quit,
    NeedsRedraw,
}

/// Handle a terminal event
pub fn handle_event(app: &mut App, event: Event) -> EventResult {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key_event(app, key),
        Event::Resize(_, _) => EventResult::NeedsRedraw,
        _ => EventResult::Continue,
    }
}

/// Handle a key event
fn handle_key_event(app: &mut App, key: KeyEvent) -> EventResult {
    // Global shortcuts (always work)
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        match key.code {
            KeyCode::Char('c') => return EventResult::Quit,
            KeyCode::Char('n') => {
                app.trigger(Trigger::Reset);
                app.set_status("Started over");
                return EventResult::NeedsRedraw;
            }
            _ => {}
        }
    }

    // A notice is dismissed by the next key press
    if app.machine.take_notice().is_some() {
        return EventResult::NeedsRedraw;
    }
    app.clear_status();

    match app.machine.view() {
        View::Home => handle_home(app, key),
        View::CharacterCreation => handle_creation(app, key),
        View::CharacterSheet => handle_sheet(app, key),
        View::Game => match app.input_mode {
            InputMode::Normal => handle_game_normal(app, key),
            InputMode::Insert => handle_game_insert(app, key),
        },
    }
}

fn handle_home(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Enter | KeyCode::Char('b') => {
            app.trigger(Trigger::Begin);
            EventResult::NeedsRedraw
        }
        KeyCode::Char('q') | KeyCode::Esc => EventResult::Quit,
        _ => EventResult::Continue,
    }
}

fn handle_creation(app: &mut App, key: KeyEvent) -> EventResult {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char('r') = key.code {
            app.trigger(Trigger::RetryOptions);
            return EventResult::NeedsRedraw;
        }
        return EventResult::Continue;
    }

    match key.code {
        KeyCode::Tab | KeyCode::Down => {
            app.focused_field = app.focused_field.next();
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.focused_field = app.focused_field.prev();
        }
        KeyCode::Enter => app.trigger(Trigger::Submit),
        KeyCode::Esc => app.trigger(Trigger::Back),
        code if app.focused_field == DraftField::Name => match code {
            KeyCode::Char(c) => app.type_name_char(c),
            KeyCode::Backspace => app.delete_name_char(),
            _ => return EventResult::Continue,
        },
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char(' ') => app.cycle_option(true),
        KeyCode::Left | KeyCode::Char('h') => app.cycle_option(false),
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

fn handle_sheet(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Enter | KeyCode::Char('a') => app.trigger(Trigger::BeginAdventure),
        KeyCode::Char('e') | KeyCode::Esc => app.trigger(Trigger::Edit),
        KeyCode::Char('q') => return EventResult::Quit,
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

fn handle_game_normal(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.select_next_choice(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_choice(),
        KeyCode::Enter => app.choose_selected(),
        KeyCode::Char(c @ '1'..='9') => {
            let number = c.to_digit(10).map_or(0, |d| d as usize);
            app.choice_index = number.saturating_sub(1).min(app.choice_count().saturating_sub(1));
            app.trigger(Trigger::ChooseNumber(number));
        }
        KeyCode::Char('i') => app.input_mode = InputMode::Insert,
        KeyCode::Char('J') => app.toggle_journal(),
        KeyCode::Esc if app.show_journal => app.show_journal = false,
        KeyCode::Char('q') => return EventResult::Quit,
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}

fn handle_game_insert(app: &mut App, key: KeyEvent) -> EventResult {
    match key.code {
        KeyCode::Esc => app.input_mode = InputMode::Normal,
        KeyCode::Enter => app.submit_input(),
        KeyCode::Backspace => app.pop_input(),
        KeyCode::Char(c) => app.push_input(c),
        _ => return EventResult::Continue,
    }
    EventResult::NeedsRedraw
}
