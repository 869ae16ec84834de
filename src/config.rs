// Configuration: process-wide settings read from the environment, and the
// immutable per-run configuration captured when the user starts a run.

use crate::api::DEFAULT_URL;
use crate::error::RenderError;
use crate::stripes::StripeStyle;

pub const DEFAULT_DECK: &str = "Image Stripes Deck";
pub const DEFAULT_MODEL: &str = "Basic";
pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_WIDTH_PERCENT: u8 = 5;
pub const DEFAULT_STRIPE_COUNTS: [u32; 3] = [3, 6, 10];

pub const MAX_WIDTH_PERCENT: u8 = 10;
pub const MAX_STRIPES: u32 = 50;

/// Settings that do not change during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Endpoint of the flashcard service.
    pub service_url: String,
    /// Deck offered when the service cannot list its decks.
    pub fallback_deck: String,
    /// Two-field note type used for every card.
    pub model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            service_url: DEFAULT_URL.into(),
            fallback_deck: DEFAULT_DECK.into(),
            model: DEFAULT_MODEL.into(),
        }
    }
}

impl Settings {
    /// Build settings from `ANKI_CONNECT_URL`, `STRIPE_CARDS_DECK` and
    /// `STRIPE_CARDS_MODEL`, falling back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Settings::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Settings {
            service_url: non_empty("ANKI_CONNECT_URL").unwrap_or(defaults.service_url),
            fallback_deck: non_empty("STRIPE_CARDS_DECK").unwrap_or(defaults.fallback_deck),
            model: non_empty("STRIPE_CARDS_MODEL").unwrap_or(defaults.model),
        }
    }
}

/// Everything one run needs, captured once when the run starts.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub deck: String,
    pub model: String,
    pub tags: Vec<String>,
    pub style: StripeStyle,
    /// One card per entry, in card order.
    pub stripe_counts: Vec<u32>,
}

impl RunConfig {
    /// Validate user input: colour must parse, width must be within
    /// 1..=MAX_WIDTH_PERCENT and every count within 1..=MAX_STRIPES.
    pub fn new(
        deck: &str,
        model: &str,
        tags: &str,
        color: &str,
        width_percent: u8,
        stripe_counts: &[u32],
    ) -> Result<Self, RenderError> {
        if width_percent > MAX_WIDTH_PERCENT {
            return Err(RenderError::InvalidWidth(width_percent));
        }
        if stripe_counts.is_empty() {
            return Err(RenderError::NoJobs);
        }
        if let Some(&bad) = stripe_counts
            .iter()
            .find(|&&n| !(1..=MAX_STRIPES).contains(&n))
        {
            return Err(RenderError::InvalidCount(bad));
        }

        Ok(RunConfig {
            deck: deck.to_string(),
            model: model.to_string(),
            tags: parse_tags(tags),
            style: StripeStyle::new(color, width_percent)?,
            stripe_counts: stripe_counts.to_vec(),
        })
    }
}

/// Split a comma separated tag field, trimming whitespace and dropping
/// empty entries.
pub fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}
