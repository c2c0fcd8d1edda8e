//! Minimal client for the narrative adventure backend.
//!
//! This crate provides a focused client for the backend's JSON API with:
//! - Character option lookup and character creation
//! - Starting an adventure and submitting story choices
//! - Session history lookup
//!
//! Every transport problem (connection failure, timeout, non-2xx status,
//! malformed body) is reported through the single [`Error`] type so callers
//! can treat them uniformly.

use chrono::NaiveDateTime;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const DEFAULT_TIMEOUT_SECS: u64 = 120;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Environment variable holding the backend base URL.
pub const BACKEND_URL_VAR: &str = "ADVENTURE_BACKEND_URL";
const TIMEOUT_VAR: &str = "ADVENTURE_TIMEOUT_SECS";
const CONNECT_TIMEOUT_VAR: &str = "ADVENTURE_CONNECT_TIMEOUT_SECS";

/// Errors that can occur when talking to the adventure backend.
///
/// `Clone` so that one in-flight result can be handed to several waiters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    #[error("Backend URL not configured - set ADVENTURE_BACKEND_URL")]
    NoBaseUrl,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether the failure happened before any response arrived.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }
}

/// Connection settings for [`StoryApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL of the backend, without the `/api` prefix.
    pub base_url: String,
    /// Timeout for a whole request, including the response body.
    pub timeout: Duration,
    /// Timeout for establishing the connection.
    pub connect_timeout: Duration,
}

impl ApiConfig {
    /// Create a config for the given base URL with default timeouts.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }

    /// Read the config from `ADVENTURE_BACKEND_URL` and the optional
    /// `ADVENTURE_TIMEOUT_SECS` / `ADVENTURE_CONNECT_TIMEOUT_SECS` variables.
    pub fn from_env() -> Result<Self, Error> {
        let base_url = std::env::var(BACKEND_URL_VAR).map_err(|_| Error::NoBaseUrl)?;
        Self::new(base_url).with_env_timeouts()
    }

    /// Override the timeouts from `ADVENTURE_TIMEOUT_SECS` and
    /// `ADVENTURE_CONNECT_TIMEOUT_SECS` where they are set.
    pub fn with_env_timeouts(mut self) -> Result<Self, Error> {
        if let Some(secs) = env_secs(TIMEOUT_VAR)? {
            self.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = env_secs(CONNECT_TIMEOUT_VAR)? {
            self.connect_timeout = Duration::from_secs(secs);
        }
        Ok(self)
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

fn env_secs(name: &str) -> Result<Option<u64>, Error> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{name} must be a whole number of seconds: {e}"))),
        Err(_) => Ok(None),
    }
}

/// Adventure backend client.
#[derive(Clone)]
pub struct StoryApi {
    client: reqwest::Client,
    base_url: Url,
}

impl StoryApi {
    /// Create a new client from the given config.
    pub fn new(config: ApiConfig) -> Result<Self, Error> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::Config(format!("Invalid backend URL {:?}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Backend URL {:?} cannot be used as a base",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// Create a client from environment variables (see [`ApiConfig::from_env`]).
    pub fn from_env() -> Result<Self, Error> {
        Self::new(ApiConfig::from_env()?)
    }

    /// The base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Probe the backend root endpoint.
    pub async fn health(&self) -> Result<HealthStatus, Error> {
        self.get(&[""]).await
    }

    /// Fetch the races, classes and backgrounds offered during creation.
    pub async fn character_options(&self) -> Result<CharacterOptions, Error> {
        self.get(&["characters", "options"]).await
    }

    /// Create a character; the backend computes the derived stats.
    pub async fn create_character(&self, character: &NewCharacter) -> Result<Character, Error> {
        self.post(&["characters"], Some(character)).await
    }

    /// Fetch a previously created character.
    pub async fn get_character(&self, character_id: &str) -> Result<Character, Error> {
        self.get(&["characters", character_id]).await
    }

    /// Start a new adventure session for a character.
    ///
    /// Not idempotent: every call creates a distinct session on the server.
    pub async fn start_adventure(&self, character_id: &str) -> Result<AdventureStart, Error> {
        self.post::<(), _>(&["story", "start", character_id], None)
            .await
    }

    /// Submit a choice for a running session and get the next story state.
    pub async fn submit_choice(
        &self,
        session_id: &str,
        choice_text: &str,
    ) -> Result<StoryState, Error> {
        let body = ChoiceRequest { choice_text };
        self.post(&["story", "choice", session_id], Some(&body))
            .await
    }

    /// Fetch what the server remembers about a session.
    pub async fn story_history(&self, session_id: &str) -> Result<StoryHistory, Error> {
        self.get(&["story", "history", session_id]).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, Error> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("Backend URL {} cannot be a base", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, Error> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        read_json(response).await
    }

    async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T, Error> {
        let url = self.endpoint(segments)?;
        debug!(%url, "POST");

        let mut request = self.client.post(url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        read_json(response).await
    }
}

async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, Error> {
    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Api {
            status,
            message: body,
        });
    }

    // Read the body first so a dropped connection is a network error and
    // only a bad payload is a parse error.
    let bytes = response
        .bytes()
        .await
        .map_err(|e| Error::Network(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| Error::Parse(e.to_string()))
}

// ============================================================================
// Public types
// ============================================================================

/// Races, classes and backgrounds offered during character creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterOptions {
    #[serde(default)]
    pub races: Vec<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    #[serde(default)]
    pub backgrounds: Vec<String>,
}

impl CharacterOptions {
    /// True when there is nothing to choose from.
    pub fn is_empty(&self) -> bool {
        self.races.is_empty() && self.classes.is_empty() && self.backgrounds.is_empty()
    }
}

/// Body of a character creation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCharacter {
    pub name: String,
    pub race: String,
    pub character_class: String,
    pub background: String,
}

/// A character as computed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    pub id: String,
    pub name: String,
    pub race: String,
    pub character_class: String,
    pub background: String,
    pub level: u32,
    pub hit_points: i32,
    pub armor_class: i32,
    pub strength: i32,
    pub dexterity: i32,
    pub constitution: i32,
    pub intelligence: i32,
    pub wisdom: i32,
    pub charisma: i32,
    pub gold: u32,
    #[serde(default)]
    pub inventory: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
}

impl Character {
    /// The six ability scores in sheet order, with their short labels.
    pub fn ability_scores(&self) -> [(&'static str, i32); 6] {
        [
            ("STR", self.strength),
            ("DEX", self.dexterity),
            ("CON", self.constitution),
            ("INT", self.intelligence),
            ("WIS", self.wisdom),
            ("CHA", self.charisma),
        ]
    }
}

/// Ability modifier for a score (rounds toward negative infinity).
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// The current story segment and what the player may do next.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryState {
    pub story_text: String,
    /// Ordered; choices are numbered and selected by position.
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub combat_encounter: bool,
}

impl StoryState {
    /// Get a choice by its 1-based number.
    pub fn choice(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|index| self.choices.get(index))
            .map(String::as_str)
    }

    /// The location name, if the backend sent a non-blank one.
    pub fn location_name(&self) -> Option<&str> {
        self.location
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Response to starting an adventure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdventureStart {
    pub session_id: String,
    pub story: StoryState,
}

/// Server-side record of a session's progress.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryHistory {
    #[serde(default)]
    pub story_history: Vec<String>,
    #[serde(default)]
    pub choices_made: Vec<String>,
    #[serde(default)]
    pub current_location: String,
}

/// Response from the backend root endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub message: String,
}

// ============================================================================
// Internal API types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChoiceRequest<'a> {
    choice_text: &'a str,
}
