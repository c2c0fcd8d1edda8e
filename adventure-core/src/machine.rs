//! The view state machine.
//!
//! [`ViewStateMachine`] owns everything the client knows about the current
//! session and is the only place it changes. It never performs I/O itself:
//! [`dispatch`](ViewStateMachine::dispatch) turns a [`Trigger`] into at most
//! one [`Command`], somebody else executes it, and the resulting
//! [`Completion`] is handed back to [`complete`](ViewStateMachine::complete),
//! which commits it in one step.
//!
//! Every command carries a [`RequestTag`]. A completion is only committed if
//! its tag is the one the machine is currently waiting for, so responses that
//! land after a reset (or after the player left the view that issued them)
//! are dropped instead of resurrecting old state.

use crate::backend::RequestFailure;
use crate::draft::{CharacterDraft, DraftField, ValidationFailure};
use std::fmt;
use std::sync::Arc;
use story_api::{AdventureStart, Character, CharacterOptions, NewCharacter, StoryHistory, StoryState};
use thiserror::Error;
use tracing::{debug, info, warn};

const CREATE_FAILED: &str = "Error creating character. Please try again.";
const START_FAILED: &str = "Error starting adventure. Please try again.";
const CHOICE_FAILED: &str = "Error processing choice. Please try again.";
const OPTIONS_FAILED: &str = "Could not load character options. Retry to try again.";
const HISTORY_FAILED: &str = "Error loading journal. Please try again.";

static NO_OPTIONS: CharacterOptions = CharacterOptions {
    races: Vec::new(),
    classes: Vec::new(),
    backgrounds: Vec::new(),
};

/// Which screen the player is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    #[default]
    Home,
    CharacterCreation,
    CharacterSheet,
    Game,
}

impl View {
    pub fn name(&self) -> &'static str {
        match self {
            View::Home => "home",
            View::CharacterCreation => "character-creation",
            View::CharacterSheet => "character-sheet",
            View::Game => "game",
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A running adventure: the server's session id and the latest story state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdventureSession {
    pub session_id: String,
    pub story: StoryState,
}

/// View plus the data that view requires. The game phase cannot exist
/// without a character and a session.
#[derive(Debug)]
enum Phase {
    Home {
        character: Option<Character>,
    },
    CharacterCreation {
        character: Option<Character>,
    },
    CharacterSheet {
        character: Character,
    },
    Game {
        character: Character,
        session: AdventureSession,
    },
}

impl Phase {
    fn view(&self) -> View {
        match self {
            Phase::Home { .. } => View::Home,
            Phase::CharacterCreation { .. } => View::CharacterCreation,
            Phase::CharacterSheet { .. } => View::CharacterSheet,
            Phase::Game { .. } => View::Game,
        }
    }

    fn character(&self) -> Option<&Character> {
        match self {
            Phase::Home { character } | Phase::CharacterCreation { character } => {
                character.as_ref()
            }
            Phase::CharacterSheet { character } | Phase::Game { character, .. } => Some(character),
        }
    }

    fn into_character(self) -> Option<Character> {
        match self {
            Phase::Home { character } | Phase::CharacterCreation { character } => character,
            Phase::CharacterSheet { character } | Phase::Game { character, .. } => Some(character),
        }
    }
}

/// Something the player asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// Home: open character creation.
    Begin,
    /// Character creation: return home.
    Back,
    /// Character creation: validate the draft and create the character.
    Submit,
    /// Character sheet: return to character creation with the draft kept.
    Edit,
    /// Character sheet: start an adventure for the character.
    BeginAdventure,
    /// Game: submit a choice. Any text is accepted.
    Choose(String),
    /// Game: submit the listed choice with this 1-based number.
    ChooseNumber(usize),
    /// Character creation: fetch the options again after a failure.
    RetryOptions,
    /// Game: fetch the server's record of the session.
    Journal,
    /// Any view: discard everything and return home.
    Reset,
}

impl Trigger {
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::Begin => "begin",
            Trigger::Back => "back",
            Trigger::Submit => "submit",
            Trigger::Edit => "edit",
            Trigger::BeginAdventure => "begin-adventure",
            Trigger::Choose(_) => "choose",
            Trigger::ChooseNumber(_) => "choose-number",
            Trigger::RetryOptions => "retry-options",
            Trigger::Journal => "journal",
            Trigger::Reset => "reset",
        }
    }
}

/// Why a trigger did not fire. A rejected trigger has no side effects
/// beyond the validation notice.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error("Still waiting for the previous request")]
    Busy,

    #[error("'{trigger}' is not available in the {view} view")]
    NotAvailable { view: View, trigger: &'static str },

    #[error("There is no choice number {0}")]
    NoSuchChoice(usize),

    #[error("Character options are already loaded")]
    OptionsLoaded,
}

/// Identifies one issued command.
///
/// The epoch advances on every reset; the id is unique within the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestTag {
    pub epoch: u64,
    pub id: u64,
}

impl fmt::Display for RequestTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.epoch, self.id)
    }
}

/// A backend call the machine wants made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    FetchOptions,
    CreateCharacter(NewCharacter),
    StartAdventure { character_id: String },
    SubmitChoice { session_id: String, choice_text: String },
    FetchHistory { session_id: String },
}

/// A tagged request, produced by [`ViewStateMachine::dispatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub tag: RequestTag,
    pub request: Request,
}

impl Command {
    /// The completion for this command when it could not be executed at all.
    pub fn fail(&self, error: RequestFailure) -> Completion {
        let outcome = match &self.request {
            Request::FetchOptions => Outcome::Options(Err(error)),
            Request::CreateCharacter(_) => Outcome::CharacterCreated(Err(error)),
            Request::StartAdventure { .. } => Outcome::AdventureStarted(Err(error)),
            Request::SubmitChoice { .. } => Outcome::ChoiceResolved(Err(error)),
            Request::FetchHistory { .. } => Outcome::History(Err(error)),
        };
        Completion {
            tag: self.tag,
            outcome,
        }
    }
}

/// The settled result of a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Options(Result<Arc<CharacterOptions>, RequestFailure>),
    CharacterCreated(Result<Character, RequestFailure>),
    AdventureStarted(Result<AdventureStart, RequestFailure>),
    ChoiceResolved(Result<StoryState, RequestFailure>),
    History(Result<StoryHistory, RequestFailure>),
}

/// An [`Outcome`] together with the tag of the command it answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub tag: RequestTag,
    pub outcome: Outcome,
}

/// What [`ViewStateMachine::complete`] did with a completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The result was stored (and the view may have changed).
    Committed,
    /// The request failed; a notice was raised and nothing else changed.
    Failed,
    /// Nobody was waiting for this tag any more; dropped.
    Stale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Validation,
    Failure,
}

/// A one-shot message for the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

impl Notice {
    fn validation(failure: &ValidationFailure) -> Self {
        Self {
            kind: NoticeKind::Validation,
            message: failure.to_string(),
        }
    }

    fn failure(message: &str) -> Self {
        Self {
            kind: NoticeKind::Failure,
            message: message.to_string(),
        }
    }
}

/// The client session state machine.
#[derive(Debug)]
pub struct ViewStateMachine {
    phase: Phase,
    draft: CharacterDraft,
    options: Option<Arc<CharacterOptions>>,
    history: Option<StoryHistory>,
    notice: Option<Notice>,
    epoch: u64,
    next_id: u64,
    /// The pending submit-class request; `Some` means loading.
    in_flight: Option<RequestTag>,
    options_in_flight: Option<RequestTag>,
    history_in_flight: Option<RequestTag>,
}

impl Default for ViewStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewStateMachine {
    pub fn new() -> Self {
        Self {
            phase: Phase::Home { character: None },
            draft: CharacterDraft::default(),
            options: None,
            history: None,
            notice: None,
            epoch: 0,
            next_id: 0,
            in_flight: None,
            options_in_flight: None,
            history_in_flight: None,
        }
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn view(&self) -> View {
        self.phase.view()
    }

    /// True while a submit-class request (submit, begin-adventure, choose)
    /// is pending.
    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn character(&self) -> Option<&Character> {
        self.phase.character()
    }

    pub fn session(&self) -> Option<&AdventureSession> {
        match &self.phase {
            Phase::Game { session, .. } => Some(session),
            _ => None,
        }
    }

    pub fn story(&self) -> Option<&StoryState> {
        self.session().map(|session| &session.story)
    }

    pub fn draft(&self) -> &CharacterDraft {
        &self.draft
    }

    /// The character options, or an empty set if they are not loaded.
    pub fn options(&self) -> &CharacterOptions {
        self.options.as_deref().unwrap_or(&NO_OPTIONS)
    }

    pub fn options_loaded(&self) -> bool {
        self.options.is_some()
    }

    pub fn is_fetching_options(&self) -> bool {
        self.options_in_flight.is_some()
    }

    /// The last journal fetched for the current session.
    pub fn history(&self) -> Option<&StoryHistory> {
        self.history.as_ref()
    }

    pub fn is_fetching_history(&self) -> bool {
        self.history_in_flight.is_some()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Remove and return the pending notice.
    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Edit one field of the draft. Only possible during character creation.
    pub fn set_draft_field(
        &mut self,
        field: DraftField,
        value: impl Into<String>,
    ) -> Result<(), Rejection> {
        if self.view() != View::CharacterCreation {
            return Err(Rejection::NotAvailable {
                view: self.view(),
                trigger: "edit-field",
            });
        }
        self.draft.set(field, value);
        Ok(())
    }

    /// Apply a trigger. Returns the command to execute, if any.
    pub fn dispatch(&mut self, trigger: Trigger) -> Result<Option<Command>, Rejection> {
        let name = trigger.name();
        let from = self.view();

        let result = self.route(trigger);

        match &result {
            Err(rejection) => debug!(view = %from, trigger = name, %rejection, "Trigger rejected"),
            Ok(_) if self.view() != from => {
                info!(from = %from, to = %self.view(), trigger = name, "View changed")
            }
            Ok(_) => {}
        }
        if let Ok(Some(command)) = &result {
            info!(tag = %command.tag, request = ?command.request, "Issuing request");
        }

        result
    }

    fn route(&mut self, trigger: Trigger) -> Result<Option<Command>, Rejection> {
        match (self.view(), trigger) {
            (_, Trigger::Reset) => {
                self.reset();
                Ok(None)
            }

            (View::Home, Trigger::Begin) => {
                let character = self.take_phase().into_character();
                self.phase = Phase::CharacterCreation { character };
                if self.options.is_some() || self.options_in_flight.is_some() {
                    return Ok(None);
                }
                Ok(Some(self.issue_options()))
            }

            // A pending create keeps `loading` set; its result is dropped
            // if it lands outside the creation view.
            (View::CharacterCreation, Trigger::Back) => {
                let character = self.take_phase().into_character();
                self.phase = Phase::Home { character };
                Ok(None)
            }

            (View::CharacterCreation, Trigger::Submit) => {
                self.ensure_idle()?;
                let request = match self.draft.validate() {
                    Ok(request) => request,
                    Err(failure) => {
                        self.notice = Some(Notice::validation(&failure));
                        return Err(failure.into());
                    }
                };
                Ok(Some(self.issue(Request::CreateCharacter(request))))
            }

            (View::CharacterCreation, Trigger::RetryOptions) => {
                if self.options.is_some() {
                    return Err(Rejection::OptionsLoaded);
                }
                if self.options_in_flight.is_some() {
                    return Err(Rejection::Busy);
                }
                Ok(Some(self.issue_options()))
            }

            (View::CharacterSheet, Trigger::Edit) => {
                let character = self.take_phase().into_character();
                self.phase = Phase::CharacterCreation { character };
                Ok(None)
            }

            (View::CharacterSheet, Trigger::BeginAdventure) => {
                self.ensure_idle()?;
                let character_id = match self.character() {
                    Some(character) => character.id.clone(),
                    None => return Err(self.not_available(&Trigger::BeginAdventure)),
                };
                Ok(Some(self.issue(Request::StartAdventure { character_id })))
            }

            (View::Game, Trigger::ChooseNumber(number)) => {
                self.ensure_idle()?;
                let choice_text = match self.story().and_then(|story| story.choice(number)) {
                    Some(text) => text.to_string(),
                    None if self.story().is_some() => return Err(Rejection::NoSuchChoice(number)),
                    None => return Err(self.not_available(&Trigger::ChooseNumber(number))),
                };
                self.issue_choice(choice_text)
            }

            (View::Game, Trigger::Choose(choice_text)) => {
                self.ensure_idle()?;
                self.issue_choice(choice_text)
            }

            (View::Game, Trigger::Journal) => {
                if self.history_in_flight.is_some() {
                    return Err(Rejection::Busy);
                }
                let session_id = match self.session() {
                    Some(session) => session.session_id.clone(),
                    None => return Err(self.not_available(&Trigger::Journal)),
                };
                let tag = self.next_tag();
                self.history_in_flight = Some(tag);
                Ok(Some(Command {
                    tag,
                    request: Request::FetchHistory { session_id },
                }))
            }

            (_, trigger) => Err(self.not_available(&trigger)),
        }
    }

    /// Feed back the result of a command issued by [`dispatch`](Self::dispatch).
    pub fn complete(&mut self, completion: Completion) -> Applied {
        let Completion { tag, outcome } = completion;

        match outcome {
            Outcome::Options(result) => {
                if self.options_in_flight != Some(tag) {
                    return stale(tag, "options");
                }
                self.options_in_flight = None;
                match result {
                    Ok(options) => {
                        self.options = Some(options);
                        Applied::Committed
                    }
                    Err(e) => self.fail(OPTIONS_FAILED, &e),
                }
            }

            Outcome::History(result) => {
                if self.history_in_flight != Some(tag) {
                    return stale(tag, "history");
                }
                self.history_in_flight = None;
                match result {
                    Ok(history) => {
                        info!(entries = history.story_history.len(), "Journal loaded");
                        self.history = Some(history);
                        Applied::Committed
                    }
                    Err(e) => self.fail(HISTORY_FAILED, &e),
                }
            }

            Outcome::CharacterCreated(result) => {
                if !self.settle(tag) {
                    return stale(tag, "create character");
                }
                match result {
                    Ok(character) => {
                        if self.view() != View::CharacterCreation {
                            return stale(tag, "create character");
                        }
                        info!(character_id = %character.id, name = %character.name, "Character created");
                        self.phase = Phase::CharacterSheet { character };
                        Applied::Committed
                    }
                    Err(e) => self.fail(CREATE_FAILED, &e),
                }
            }

            Outcome::AdventureStarted(result) => {
                if !self.settle(tag) {
                    return stale(tag, "start adventure");
                }
                match result {
                    Ok(start) => match self.take_phase() {
                        Phase::CharacterSheet { character } => {
                            info!(session_id = %start.session_id, "Adventure started");
                            self.history = None;
                            self.phase = Phase::Game {
                                character,
                                session: AdventureSession {
                                    session_id: start.session_id,
                                    story: start.story,
                                },
                            };
                            Applied::Committed
                        }
                        other => {
                            self.phase = other;
                            stale(tag, "start adventure")
                        }
                    },
                    Err(e) => self.fail(START_FAILED, &e),
                }
            }

            Outcome::ChoiceResolved(result) => {
                if !self.settle(tag) {
                    return stale(tag, "choice");
                }
                match result {
                    Ok(story) => match &mut self.phase {
                        Phase::Game { session, .. } => {
                            info!(
                                choices = story.choices.len(),
                                combat = story.combat_encounter,
                                "Story advanced"
                            );
                            session.story = story;
                            Applied::Committed
                        }
                        _ => stale(tag, "choice"),
                    },
                    Err(e) => self.fail(CHOICE_FAILED, &e),
                }
            }
        }
    }

    /// Discard the character, session and draft and return home.
    ///
    /// Cached options survive, and so does an options fetch in progress.
    pub fn reset(&mut self) {
        self.epoch += 1;
        if let Some(tag) = self.in_flight.take() {
            debug!(%tag, "Abandoning pending request on reset");
        }
        self.history_in_flight = None;
        self.phase = Phase::Home { character: None };
        self.draft.clear();
        self.history = None;
        self.notice = None;
        info!(epoch = self.epoch, "Session reset");
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn take_phase(&mut self) -> Phase {
        std::mem::replace(&mut self.phase, Phase::Home { character: None })
    }

    fn ensure_idle(&self) -> Result<(), Rejection> {
        if self.in_flight.is_some() {
            return Err(Rejection::Busy);
        }
        Ok(())
    }

    fn not_available(&self, trigger: &Trigger) -> Rejection {
        Rejection::NotAvailable {
            view: self.view(),
            trigger: trigger.name(),
        }
    }

    fn next_tag(&mut self) -> RequestTag {
        self.next_id += 1;
        RequestTag {
            epoch: self.epoch,
            id: self.next_id,
        }
    }

    /// Issue a submit-class request and set loading.
    fn issue(&mut self, request: Request) -> Command {
        let tag = self.next_tag();
        self.in_flight = Some(tag);
        Command { tag, request }
    }

    fn issue_options(&mut self) -> Command {
        let tag = self.next_tag();
        self.options_in_flight = Some(tag);
        Command {
            tag,
            request: Request::FetchOptions,
        }
    }

    fn issue_choice(&mut self, choice_text: String) -> Result<Option<Command>, Rejection> {
        let session = match self.session() {
            Some(session) => session,
            None => return Err(self.not_available(&Trigger::Choose(choice_text))),
        };
        if !session.story.choices.contains(&choice_text) {
            debug!(choice = %choice_text, "Submitting a choice that is not listed");
        }
        let session_id = session.session_id.clone();
        Ok(Some(self.issue(Request::SubmitChoice {
            session_id,
            choice_text,
        })))
    }

    /// Clear loading if `tag` is the awaited request.
    fn settle(&mut self, tag: RequestTag) -> bool {
        if self.in_flight == Some(tag) {
            self.in_flight = None;
            true
        } else {
            false
        }
    }

    fn fail(&mut self, message: &str, error: &RequestFailure) -> Applied {
        warn!(%error, "{message}");
        self.notice = Some(Notice::failure(message));
        Applied::Failed
    }
}

fn stale(tag: RequestTag, what: &str) -> Applied {
    warn!(%tag, what, "Discarding stale completion");
    Applied::Stale
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{sample_character, sample_options, sample_story};

    fn network_down() -> RequestFailure {
        RequestFailure::Network("connection refused".to_string())
    }

    fn filled_machine() -> ViewStateMachine {
        let mut machine = ViewStateMachine::new();
        machine.dispatch(Trigger::Begin).unwrap();
        for (field, value) in DraftField::ALL.into_iter().zip(["Kael", "Elf", "Rogue", "Orphan"]) {
            machine.set_draft_field(field, value).unwrap();
        }
        machine
    }

    fn in_game() -> ViewStateMachine {
        let mut machine = filled_machine();
        let create = machine.dispatch(Trigger::Submit).unwrap().unwrap();
        machine.complete(Completion {
            tag: create.tag,
            outcome: Outcome::CharacterCreated(Ok(sample_character("c1"))),
        });
        let start = machine.dispatch(Trigger::BeginAdventure).unwrap().unwrap();
        machine.complete(Completion {
            tag: start.tag,
            outcome: Outcome::AdventureStarted(Ok(AdventureStart {
                session_id: "s1".to_string(),
                story: sample_story(),
            })),
        });
        assert_eq!(machine.view(), View::Game);
        machine
    }

    #[test]
    fn test_initial_state() {
        let machine = ViewStateMachine::new();
        assert_eq!(machine.view(), View::Home);
        assert!(!machine.is_loading());
        assert!(machine.character().is_none());
        assert!(machine.session().is_none());
        assert!(machine.options().is_empty());
    }

    #[test]
    fn test_begin_fetches_options_once() {
        let mut machine = ViewStateMachine::new();
        let command = machine.dispatch(Trigger::Begin).unwrap().unwrap();
        assert_eq!(command.request, Request::FetchOptions);
        assert!(machine.is_fetching_options());
        assert!(!machine.is_loading());

        // Back and begin again while the fetch is running: no second fetch
        machine.dispatch(Trigger::Back).unwrap();
        assert_eq!(machine.dispatch(Trigger::Begin).unwrap(), None);

        let applied = machine.complete(Completion {
            tag: command.tag,
            outcome: Outcome::Options(Ok(Arc::new(sample_options()))),
        });
        assert_eq!(applied, Applied::Committed);
        assert_eq!(machine.options().races, vec!["Human", "Elf"]);

        machine.dispatch(Trigger::Back).unwrap();
        assert_eq!(machine.dispatch(Trigger::Begin).unwrap(), None);
    }

    #[test]
    fn test_options_failure_then_retry() {
        let mut machine = ViewStateMachine::new();
        let command = machine.dispatch(Trigger::Begin).unwrap().unwrap();
        assert_eq!(
            machine.dispatch(Trigger::RetryOptions),
            Err(Rejection::Busy)
        );

        let applied = machine.complete(command.fail(network_down()));
        assert_eq!(applied, Applied::Failed);
        assert_eq!(machine.view(), View::CharacterCreation);
        assert!(machine.options().is_empty());
        assert_eq!(machine.take_notice().unwrap().kind, NoticeKind::Failure);
        assert!(machine.notice().is_none());

        let retry = machine.dispatch(Trigger::RetryOptions).unwrap().unwrap();
        assert_eq!(retry.request, Request::FetchOptions);
        machine.complete(Completion {
            tag: retry.tag,
            outcome: Outcome::Options(Ok(Arc::new(sample_options()))),
        });
        assert_eq!(
            machine.dispatch(Trigger::RetryOptions),
            Err(Rejection::OptionsLoaded)
        );
    }

    #[test]
    fn test_triggers_outside_their_view_are_rejected() {
        let mut machine = ViewStateMachine::new();
        for trigger in [
            Trigger::Back,
            Trigger::Submit,
            Trigger::Edit,
            Trigger::BeginAdventure,
            Trigger::Choose("Explore".to_string()),
            Trigger::Journal,
        ] {
            let name = trigger.name();
            assert_eq!(
                machine.dispatch(trigger),
                Err(Rejection::NotAvailable {
                    view: View::Home,
                    trigger: name
                })
            );
        }
        assert_eq!(machine.view(), View::Home);
        assert!(machine
            .set_draft_field(DraftField::Name, "Kael")
            .is_err());
        assert_eq!(machine.draft(), &CharacterDraft::default());
    }

    #[test]
    fn test_submit_with_incomplete_draft() {
        let mut machine = ViewStateMachine::new();
        machine.dispatch(Trigger::Begin).unwrap();
        machine.set_draft_field(DraftField::Name, "Kael").unwrap();

        let rejection = machine.dispatch(Trigger::Submit).unwrap_err();
        assert!(matches!(rejection, Rejection::Validation(_)));
        assert!(!machine.is_loading());
        assert_eq!(machine.view(), View::CharacterCreation);

        let notice = machine.take_notice().unwrap();
        assert_eq!(notice.kind, NoticeKind::Validation);
        assert!(notice.message.starts_with("Please fill in all character details"));
    }

    #[test]
    fn test_create_failure_keeps_draft() {
        let mut machine = filled_machine();
        let command = machine.dispatch(Trigger::Submit).unwrap().unwrap();
        assert!(machine.is_loading());
        assert_eq!(machine.dispatch(Trigger::Submit), Err(Rejection::Busy));

        assert_eq!(machine.complete(command.fail(network_down())), Applied::Failed);
        assert!(!machine.is_loading());
        assert_eq!(machine.view(), View::CharacterCreation);
        assert_eq!(machine.draft().name, "Kael");
        assert_eq!(
            machine.notice().map(|n| n.message.as_str()),
            Some("Error creating character. Please try again.")
        );
    }

    #[test]
    fn test_edit_keeps_draft_and_character() {
        let mut machine = filled_machine();
        let command = machine.dispatch(Trigger::Submit).unwrap().unwrap();
        machine.complete(Completion {
            tag: command.tag,
            outcome: Outcome::CharacterCreated(Ok(sample_character("c1"))),
        });
        assert_eq!(machine.view(), View::CharacterSheet);

        machine.dispatch(Trigger::Edit).unwrap();
        assert_eq!(machine.view(), View::CharacterCreation);
        assert_eq!(machine.draft().race, "Elf");
        assert_eq!(machine.character().map(|c| c.id.as_str()), Some("c1"));

        // Resubmitting replaces the character
        let command = machine.dispatch(Trigger::Submit).unwrap().unwrap();
        machine.complete(Completion {
            tag: command.tag,
            outcome: Outcome::CharacterCreated(Ok(sample_character("c2"))),
        });
        assert_eq!(machine.character().map(|c| c.id.as_str()), Some("c2"));
    }

    #[test]
    fn test_choose_number() {
        let mut machine = in_game();
        assert_eq!(
            machine.dispatch(Trigger::ChooseNumber(0)),
            Err(Rejection::NoSuchChoice(0))
        );
        assert_eq!(
            machine.dispatch(Trigger::ChooseNumber(3)),
            Err(Rejection::NoSuchChoice(3))
        );

        let command = machine.dispatch(Trigger::ChooseNumber(2)).unwrap().unwrap();
        assert_eq!(
            command.request,
            Request::SubmitChoice {
                session_id: "s1".to_string(),
                choice_text: "Sleep".to_string()
            }
        );
    }

    #[test]
    fn test_choice_replaces_story() {
        let mut machine = in_game();
        let command = machine
            .dispatch(Trigger::Choose("Dance with the ghosts".to_string()))
            .unwrap()
            .unwrap();
        let next = StoryState {
            story_text: "The ghosts are delighted.".to_string(),
            choices: vec!["Bow".to_string()],
            location: Some("Ballroom".to_string()),
            combat_encounter: false,
        };
        machine.complete(Completion {
            tag: command.tag,
            outcome: Outcome::ChoiceResolved(Ok(next.clone())),
        });
        assert_eq!(machine.story(), Some(&next));
        assert!(!machine.is_loading());
    }

    #[test]
    fn test_journal() {
        let mut machine = in_game();
        let command = machine.dispatch(Trigger::Journal).unwrap().unwrap();
        assert_eq!(machine.dispatch(Trigger::Journal), Err(Rejection::Busy));
        // The journal does not block choices
        assert!(!machine.is_loading());

        let history = StoryHistory {
            story_history: vec!["You awaken...".to_string()],
            choices_made: vec![],
            current_location: "Unknown".to_string(),
        };
        machine.complete(Completion {
            tag: command.tag,
            outcome: Outcome::History(Ok(history.clone())),
        });
        assert_eq!(machine.history(), Some(&history));

        machine.reset();
        assert!(machine.history().is_none());
    }

    #[test]
    fn test_completion_after_leaving_view_is_stale() {
        let mut machine = filled_machine();
        let command = machine.dispatch(Trigger::Submit).unwrap().unwrap();
        machine.dispatch(Trigger::Back).unwrap();
        assert!(machine.is_loading());

        // Coming back does not allow a second create while the first runs
        machine.dispatch(Trigger::Begin).unwrap();
        assert_eq!(machine.dispatch(Trigger::Submit), Err(Rejection::Busy));
        machine.dispatch(Trigger::Back).unwrap();

        let applied = machine.complete(Completion {
            tag: command.tag,
            outcome: Outcome::CharacterCreated(Ok(sample_character("c1"))),
        });
        assert_eq!(applied, Applied::Stale);
        assert_eq!(machine.view(), View::Home);
        assert!(machine.character().is_none());
        assert!(!machine.is_loading());
    }

    #[test]
    fn test_edit_keeps_pending_start_in_flight() {
        let mut machine = filled_machine();
        let create = machine.dispatch(Trigger::Submit).unwrap().unwrap();
        machine.complete(Completion {
            tag: create.tag,
            outcome: Outcome::CharacterCreated(Ok(sample_character("c1"))),
        });
        let start = machine.dispatch(Trigger::BeginAdventure).unwrap().unwrap();

        machine.dispatch(Trigger::Edit).unwrap();
        assert!(machine.is_loading());
        assert_eq!(machine.dispatch(Trigger::Submit), Err(Rejection::Busy));

        let applied = machine.complete(Completion {
            tag: start.tag,
            outcome: Outcome::AdventureStarted(Ok(AdventureStart {
                session_id: "s1".to_string(),
                story: sample_story(),
            })),
        });
        assert_eq!(applied, Applied::Stale);
        assert_eq!(machine.view(), View::CharacterCreation);
        assert!(machine.session().is_none());
        assert!(!machine.is_loading());
    }

    #[test]
    fn test_reset_bumps_epoch_and_keeps_options() {
        let mut machine = ViewStateMachine::new();
        let command = machine.dispatch(Trigger::Begin).unwrap().unwrap();
        machine.complete(Completion {
            tag: command.tag,
            outcome: Outcome::Options(Ok(Arc::new(sample_options()))),
        });

        let epoch = machine.epoch();
        machine.dispatch(Trigger::Reset).unwrap();
        assert_eq!(machine.epoch(), epoch + 1);
        assert!(machine.options_loaded());
        assert_eq!(machine.dispatch(Trigger::Begin).unwrap(), None);
    }
}
