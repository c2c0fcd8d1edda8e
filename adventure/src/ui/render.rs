//! Render orchestration for the adventure TUI

use adventure_core::{DraftField, NoticeKind, View};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};
use story_api::ability_modifier;

use crate::app::{App, InputMode};

const SPINNER: [char; 4] = ['|', '/', '-', '\\'];

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(area);

    render_title_bar(frame, app, chunks[0]);

    match app.machine.view() {
        View::Home => render_home(frame, app, chunks[1]),
        View::CharacterCreation => render_creation(frame, app, chunks[1]),
        View::CharacterSheet => render_sheet(frame, app, chunks[1]),
        View::Game => render_game(frame, app, chunks[1]),
    }

    render_status_bar(frame, app, chunks[2]);
    render_hotkey_bar(frame, app, chunks[3]);

    if let Some(notice) = app.machine.notice() {
        let popup = centered_rect_fixed(60, 7, area);
        frame.render_widget(Clear, popup);

        let is_failure = notice.kind == NoticeKind::Failure;
        let title = if is_failure { " Error " } else { " Check your character " };
        let text = vec![
            Line::from(Span::styled(
                notice.message.as_str(),
                app.theme.notice_style(is_failure),
            )),
            Line::from(""),
            Line::from(Span::styled("Press any key", app.theme.hint_style())),
        ];
        let paragraph = Paragraph::new(text)
            .block(
                Block::default()
                    .title(title)
                    .borders(Borders::ALL)
                    .border_style(app.theme.notice_style(is_failure)),
            )
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![Span::styled(" Narrative Adventure ", app.theme.title_style())];

    if let Some(character) = app.machine.character() {
        spans.push(Span::raw(format!(
            "| {} the {} {} ",
            character.name, character.race, character.character_class
        )));
    }
    if let Some(story) = app.machine.story() {
        if let Some(location) = story.location_name() {
            spans.push(Span::raw(format!("| {location} ")));
        }
        if story.combat_encounter {
            spans.push(Span::styled("| COMBAT ", app.theme.combat_style()));
        }
    }

    let title = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(app.theme.border_style(false)),
    );
    frame.render_widget(title, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let text = if app.is_busy() {
        let spinner = SPINNER[(app.animation_frame as usize / 2) % SPINNER.len()];
        let what = if app.machine.is_loading() {
            match app.machine.view() {
                View::CharacterCreation => "Creating character",
                View::CharacterSheet => "Starting adventure",
                _ => "The story unfolds",
            }
        } else if app.machine.is_fetching_options() {
            "Loading character options"
        } else {
            "Reading the journal"
        };
        format!(" {spinner} {what}...")
    } else if let Some(status) = app.status() {
        format!(" {status}")
    } else {
        String::new()
    };

    frame.render_widget(Paragraph::new(text).style(app.theme.text_style()), area);
}

fn render_hotkey_bar(frame: &mut Frame, app: &App, area: Rect) {
    let hints = match app.machine.view() {
        View::Home => "Enter: begin  q: quit",
        View::CharacterCreation => {
            "Tab/↑↓: field  ←→: pick  Enter: create  Esc: back  Ctrl+r: reload options  Ctrl+n: start over"
        }
        View::CharacterSheet => "Enter: begin adventure  e: edit  Ctrl+n: start over  q: quit",
        View::Game => match app.input_mode {
            InputMode::Normal => {
                "↑↓/1-9: choose  Enter: confirm  i: type your own  J: journal  Ctrl+n: new game  q: quit"
            }
            InputMode::Insert => "Enter: send  Esc: cancel",
        },
    };
    frame.render_widget(Paragraph::new(hints).style(app.theme.hint_style()), area);
}

// ============================================================================
// Views
// ============================================================================

fn render_home(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect_fixed(50, 9, area);
    let text = vec![
        Line::from(Span::styled("Narrative Adventure", app.theme.title_style())),
        Line::from(""),
        Line::from("Create a hero and shape a story that"),
        Line::from("answers to every choice you make."),
        Line::from(""),
        Line::from(Span::styled("Press Enter to begin", app.theme.hint_style())),
    ];
    let paragraph = Paragraph::new(text)
        .alignment(ratatui::layout::Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(app.theme.border_style(true)),
        );
    frame.render_widget(paragraph, popup);
}

fn render_creation(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    // Left side: the four fields
    let block = Block::default()
        .title(" Create Your Character ")
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(true));
    let inner = block.inner(columns[0]);
    frame.render_widget(block, columns[0]);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(inner);

    let draft = app.machine.draft();
    for (i, field) in DraftField::ALL.into_iter().enumerate() {
        let focused = field == app.focused_field;
        let value = draft.get(field);
        let shown = match field {
            DraftField::Name if focused => format!("{value}█"),
            DraftField::Name => value.to_string(),
            _ if value.is_empty() => "(choose)".to_string(),
            _ => format!("◀ {value} ▶"),
        };
        let style = if value.is_empty() && field != DraftField::Name {
            app.theme.hint_style()
        } else {
            app.theme.text_style()
        };
        let input = Paragraph::new(Span::styled(shown, style)).block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!(" {} ", field.label()))
                .border_style(app.theme.border_style(focused)),
        );
        frame.render_widget(input, rows[i]);
    }

    // Right side: options for the focused select field
    render_option_list(frame, app, columns[1]);
}

fn render_option_list(frame: &mut Frame, app: &App, area: Rect) {
    let field = app.focused_field;
    let block = Block::default()
        .title(format!(" {} ", field.label()))
        .borders(Borders::ALL)
        .border_style(app.theme.border_style(false));

    let options = app.machine.options();
    let message = if app.machine.is_fetching_options() {
        Some("Loading options...")
    } else if options.is_empty() {
        Some("No options available. Press Ctrl+r to try again.")
    } else if field == DraftField::Name {
        Some("Type a name for your character.")
    } else {
        None
    };

    if let Some(message) = message {
        let paragraph = Paragraph::new(Span::styled(message, app.theme.hint_style()))
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
        return;
    }

    let choices = field.choices(options).unwrap_or(&[]);
    let items: Vec<ListItem> = choices
        .iter()
        .map(|choice| ListItem::new(choice.as_str()).style(app.theme.text_style()))
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(app.theme.choice_style(true))
        .highlight_symbol("> ");

    let mut state = ListState::default().with_selected(app.selected_option());
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_sheet(frame: &mut Frame, app: &App, area: Rect) {
    let Some(character) = app.machine.character() else {
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let heading = Style::default().add_modifier(Modifier::UNDERLINED);
    let mut left = vec![
        Line::from(Span::styled(character.name.as_str(), app.theme.title_style())),
        Line::from(format!(
            "Level {} {} {}",
            character.level, character.race, character.character_class
        )),
        Line::from(format!("Background: {}", character.background)),
        Line::from(""),
        Line::from(vec![
            Span::raw("HP: "),
            Span::styled(
                character.hit_points.to_string(),
                Style::default().fg(app.theme.hp_color(character.hit_points)),
            ),
            Span::raw(format!("   AC: {}", character.armor_class)),
        ]),
        Line::from(format!("Gold: {}", character.gold)),
        Line::from(""),
        Line::from(Span::styled("Abilities", heading)),
    ];
    for (label, score) in character.ability_scores() {
        left.push(Line::from(format!(
            "  {label}  {score:>2} ({:+})",
            ability_modifier(score)
        )));
    }
    if let Some(created_at) = character.created_at {
        left.push(Line::from(""));
        left.push(Line::from(Span::styled(
            format!("Created {}", created_at.format("%Y-%m-%d %H:%M")),
            app.theme.hint_style(),
        )));
    }

    let sheet = Paragraph::new(left).block(
        Block::default()
            .title(" Character Sheet ")
            .borders(Borders::ALL)
            .border_style(app.theme.border_style(true)),
    );
    frame.render_widget(sheet, columns[0]);

    let items: Vec<ListItem> = character
        .inventory
        .iter()
        .map(|item| ListItem::new(format!("• {item}")))
        .collect();
    let inventory = List::new(items).block(
        Block::default()
            .title(" Inventory ")
            .borders(Borders::ALL)
            .border_style(app.theme.border_style(false)),
    );
    frame.render_widget(inventory, columns[1]);
}

fn render_game(frame: &mut Frame, app: &App, area: Rect) {
    let Some(story) = app.machine.story() else {
        return;
    };

    let choice_rows = story.choices.len() as u16 + 2;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(5),
            Constraint::Length(choice_rows.max(3)),
            Constraint::Length(3),
        ])
        .split(area);

    let lines: Vec<Line> = story
        .story_text
        .lines()
        .map(|line| Line::from(Span::styled(line, app.theme.story_style())))
        .collect();
    let narrative = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Story ")
                .borders(Borders::ALL)
                .border_style(app.theme.border_style(false)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(narrative, chunks[0]);

    let items: Vec<ListItem> = story
        .choices
        .iter()
        .enumerate()
        .map(|(i, choice)| ListItem::new(format!("{}. {choice}", i + 1)))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title(" What do you do? ")
                .borders(Borders::ALL)
                .border_style(app.theme.border_style(app.input_mode == InputMode::Normal)),
        )
        .style(app.theme.choice_style(false))
        .highlight_style(app.theme.choice_style(true))
        .highlight_symbol("> ");
    let selected = (!story.choices.is_empty()).then_some(app.choice_index);
    let mut state = ListState::default().with_selected(selected);
    frame.render_stateful_widget(list, chunks[1], &mut state);

    let typing = app.input_mode == InputMode::Insert;
    let input_text = if typing {
        format!("{}█", app.input_buffer())
    } else {
        "Press i to do something else".to_string()
    };
    let input = Paragraph::new(input_text)
        .style(if typing {
            app.theme.text_style()
        } else {
            app.theme.hint_style()
        })
        .block(
            Block::default()
                .title(" Your own action ")
                .borders(Borders::ALL)
                .border_style(app.theme.border_style(typing)),
        );
    frame.render_widget(input, chunks[2]);

    if app.show_journal {
        render_journal(frame, app, area);
    }
}

fn render_journal(frame: &mut Frame, app: &App, area: Rect) {
    let popup = centered_rect_fixed(70, 20, area);
    frame.render_widget(Clear, popup);

    let heading = Style::default().add_modifier(Modifier::UNDERLINED);
    let lines = match app.machine.history() {
        Some(history) => {
            let mut lines = vec![
                Line::from(format!("Location: {}", history.current_location)),
                Line::from(""),
                Line::from(Span::styled("Choices made", heading)),
            ];
            if history.choices_made.is_empty() {
                lines.push(Line::from(Span::styled("  (none yet)", app.theme.hint_style())));
            }
            for (i, choice) in history.choices_made.iter().enumerate() {
                lines.push(Line::from(format!("  {}. {choice}", i + 1)));
            }
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                format!("{} story segments so far", history.story_history.len()),
                app.theme.hint_style(),
            )));
            lines
        }
        None if app.machine.is_fetching_history() => {
            vec![Line::from(Span::styled("Loading...", app.theme.hint_style()))]
        }
        None => vec![Line::from(Span::styled(
            "Journal unavailable.",
            app.theme.hint_style(),
        ))],
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .title(" Journal (J to close) ")
                .borders(Borders::ALL)
                .border_style(app.theme.border_style(true)),
        )
        .wrap(Wrap { trim: false });
    frame.render_widget(paragraph, popup);
}

/// A rect of at most `width` x `height`, centered in `area`.
fn centered_rect_fixed(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
