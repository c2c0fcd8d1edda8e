//! Main application state and logic

use adventure_core::{
    Completion, DraftField, Rejection, RequestFailure, Trigger, View, ViewStateMachine,
    WorkerRequest,
};
use tokio::sync::mpsc;
use tracing::warn;

use crate::ui::theme::GameTheme;

/// Input modes for the game view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Pick a listed choice with the arrow keys or a number
    #[default]
    Normal,
    /// Type a free-form choice
    Insert,
}

/// Main application state
pub struct App {
    // Channel communication with the request worker
    request_tx: mpsc::Sender<WorkerRequest>,
    completion_rx: mpsc::Receiver<Completion>,

    pub machine: ViewStateMachine,

    // UI state
    pub theme: GameTheme,
    pub focused_field: DraftField,
    pub choice_index: usize,
    pub show_journal: bool,

    // Input state
    pub input_mode: InputMode,
    input_buffer: String,

    // Status
    status_message: Option<String>,
    pub should_quit: bool,

    // Animation
    pub animation_frame: u8,
}

impl App {
    pub fn new(
        machine: ViewStateMachine,
        request_tx: mpsc::Sender<WorkerRequest>,
        completion_rx: mpsc::Receiver<Completion>,
    ) -> Self {
        Self {
            request_tx,
            completion_rx,
            machine,
            theme: GameTheme::default(),
            focused_field: DraftField::Name,
            choice_index: 0,
            show_journal: false,
            input_mode: InputMode::Normal,
            input_buffer: String::new(),
            status_message: None,
            should_quit: false,
            animation_frame: 0,
        }
    }

    /// Apply a trigger and hand any resulting request to the worker.
    pub fn trigger(&mut self, trigger: Trigger) {
        let view_before = self.machine.view();

        match self.machine.dispatch(trigger) {
            Ok(Some(command)) => {
                if let Err(e) = self.request_tx.try_send(WorkerRequest::Execute(command.clone())) {
                    warn!(error = %e, "Request worker unavailable");
                    self.machine.complete(
                        command.fail(RequestFailure::Network("request worker unavailable".into())),
                    );
                }
            }
            Ok(None) => {}
            // Validation failures surface through the machine's notice
            Err(Rejection::Validation(_)) => {}
            Err(rejection) => self.set_status(rejection.to_string()),
        }

        if self.machine.view() != view_before {
            self.on_view_changed();
        }
    }

    /// Commit every completion the worker has delivered.
    pub fn drain_completions(&mut self) {
        while let Ok(completion) = self.completion_rx.try_recv() {
            let view_before = self.machine.view();
            let story_before = self.machine.story().cloned();

            self.machine.complete(completion);

            if self.machine.view() != view_before {
                self.on_view_changed();
            } else if self.machine.story().cloned() != story_before {
                self.choice_index = 0;
            }
        }
    }

    fn on_view_changed(&mut self) {
        self.choice_index = 0;
        self.show_journal = false;
        self.input_mode = InputMode::Normal;
        self.input_buffer.clear();
        if self.machine.view() == View::CharacterCreation {
            self.focused_field = DraftField::Name;
        }
    }

    // ------------------------------------------------------------------
    // Character creation
    // ------------------------------------------------------------------

    pub fn type_name_char(&mut self, c: char) {
        let mut name = self.machine.draft().name.clone();
        if name.chars().count() < 30 {
            name.push(c);
            self.set_field(DraftField::Name, name);
        }
    }

    pub fn delete_name_char(&mut self) {
        let mut name = self.machine.draft().name.clone();
        name.pop();
        self.set_field(DraftField::Name, name);
    }

    /// Step the focused select field through its options.
    pub fn cycle_option(&mut self, forward: bool) {
        let field = self.focused_field;
        let Some(choices) = field.choices(self.machine.options()) else {
            return;
        };
        if choices.is_empty() {
            return;
        }

        let current = self.machine.draft().get(field);
        let next = match choices.iter().position(|c| c == current) {
            Some(i) if forward => (i + 1) % choices.len(),
            Some(i) => (i + choices.len() - 1) % choices.len(),
            None => 0,
        };
        let value = choices[next].clone();
        self.set_field(field, value);
    }

    fn set_field(&mut self, field: DraftField, value: String) {
        if let Err(rejection) = self.machine.set_draft_field(field, value) {
            self.set_status(rejection.to_string());
        }
    }

    /// Index of the focused select field's current value in its option list.
    pub fn selected_option(&self) -> Option<usize> {
        let choices = self.focused_field.choices(self.machine.options())?;
        let current = self.machine.draft().get(self.focused_field);
        choices.iter().position(|c| c == current)
    }

    // ------------------------------------------------------------------
    // Game
    // ------------------------------------------------------------------

    pub fn choice_count(&self) -> usize {
        self.machine.story().map_or(0, |story| story.choices.len())
    }

    pub fn select_next_choice(&mut self) {
        let count = self.choice_count();
        if count > 0 {
            self.choice_index = (self.choice_index + 1) % count;
        }
    }

    pub fn select_prev_choice(&mut self) {
        let count = self.choice_count();
        if count > 0 {
            self.choice_index = (self.choice_index + count - 1) % count;
        }
    }

    pub fn choose_selected(&mut self) {
        if self.choice_count() > 0 {
            self.trigger(Trigger::ChooseNumber(self.choice_index + 1));
        }
    }

    pub fn toggle_journal(&mut self) {
        self.show_journal = !self.show_journal;
        if self.show_journal && !self.machine.is_fetching_history() {
            self.trigger(Trigger::Journal);
        }
    }

    pub fn input_buffer(&self) -> &str {
        &self.input_buffer
    }

    pub fn push_input(&mut self, c: char) {
        self.input_buffer.push(c);
    }

    pub fn pop_input(&mut self) {
        self.input_buffer.pop();
    }

    /// Send the typed choice. Keeps the text if the machine is busy.
    pub fn submit_input(&mut self) {
        let text = self.input_buffer.trim().to_string();
        if text.is_empty() {
            return;
        }
        if self.machine.is_loading() {
            self.set_status(Rejection::Busy.to_string());
            return;
        }
        self.input_buffer.clear();
        self.input_mode = InputMode::Normal;
        self.trigger(Trigger::Choose(text));
    }

    // ------------------------------------------------------------------
    // Status and housekeeping
    // ------------------------------------------------------------------

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some(message.into());
    }

    pub fn status(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn clear_status(&mut self) {
        self.status_message = None;
    }

    /// Whether anything is waiting on the backend.
    pub fn is_busy(&self) -> bool {
        self.machine.is_loading()
            || self.machine.is_fetching_options()
            || self.machine.is_fetching_history()
    }

    pub fn tick(&mut self) {
        self.animation_frame = self.animation_frame.wrapping_add(1);
    }

    pub fn shutdown(&self) {
        let _ = self.request_tx.try_send(WorkerRequest::Shutdown);
    }
}
