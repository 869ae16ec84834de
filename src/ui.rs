// UI layer: interactive terminal front end built on `dialoguer`. It keeps the
// user's current choices for the session, captures them into a `RunConfig`
// when a run starts and prints the resulting status line.

use crate::acquire::{self, ImageSource};
use crate::api::{list_decks, FlashcardService};
use crate::config::{
    RunConfig, Settings, DEFAULT_COLOR, DEFAULT_STRIPE_COUNTS, DEFAULT_WIDTH_PERCENT,
    MAX_STRIPES, MAX_WIDTH_PERCENT,
};
use crate::stripes::parse_hex_color;
use crate::workflow::{self, Status};
use anyhow::{Context, Result};
use crossterm::style::Stylize;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use std::time::Duration;

/// Values of the controls, kept between runs of one session only.
#[derive(Debug, Clone)]
pub struct Session {
    pub source: ImageSource,
    pub decks: Vec<String>,
    pub deck: String,
    pub tags: String,
    pub color: String,
    pub width_percent: u8,
    pub stripe_counts: [u32; 3],
    /// Preview of the last loaded image, replaced on every run.
    pub preview: Option<PathBuf>,
}

impl Session {
    pub fn new(decks: Vec<String>) -> Self {
        let deck = decks.first().cloned().unwrap_or_default();
        Session {
            source: ImageSource::Clipboard,
            decks,
            deck,
            tags: String::new(),
            color: DEFAULT_COLOR.into(),
            width_percent: DEFAULT_WIDTH_PERCENT,
            stripe_counts: DEFAULT_STRIPE_COUNTS,
            preview: None,
        }
    }

    /// Snapshot the controls for one run.
    pub fn run_config(&self, settings: &Settings) -> Result<RunConfig> {
        RunConfig::new(
            &self.deck,
            &settings.model,
            &self.tags,
            &self.color,
            self.width_percent,
            &self.stripe_counts,
        )
        .context("Invalid stripe settings")
    }
}

/// Main interactive menu. Fetches the deck list once, then loops until the
/// user chooses "Exit".
pub fn main_menu(settings: &Settings, service: &dyn FlashcardService) -> Result<()> {
    if !service.is_reachable() {
        println!(
            "{}",
            format!("Flashcard service not reachable at {}", settings.service_url).yellow()
        );
    }
    let mut session = Session::new(list_decks(service, &settings.fallback_deck));

    loop {
        print_summary(&session);
        let items = vec![
            "Process and create cards",
            "Input source",
            "Deck and tags",
            "Stripe settings",
            "Exit",
        ];
        let selection = Select::new().items(&items).default(0).interact()?;
        match selection {
            0 => {
                let status = handle_process(&mut session, settings, service)?;
                print_status(&status);
            }
            1 => choose_source(&mut session)?,
            2 => edit_deck_and_tags(&mut session)?,
            3 => edit_stripes(&mut session)?,
            4 => break,
            _ => {}
        }
    }
    acquire::remove_preview(session.preview.as_deref());
    Ok(())
}

/// Acquire the image, render and upload. Settings are read once, up front.
fn handle_process(
    session: &mut Session,
    settings: &Settings,
    service: &dyn FlashcardService,
) -> Result<Status> {
    let config = match session.run_config(settings) {
        Ok(config) => config,
        Err(e) => return Ok(Status::RenderFailed(format!("{e:#}"))),
    };
    let timestamp = workflow::run_timestamp();

    let image = acquire::acquire(session.source);
    if let Ok(img) = &image {
        match acquire::replace_preview(session.preview.as_deref(), img) {
            Ok(path) => {
                println!("Preview of loaded image: {}", path.display());
                session.preview = Some(path);
            }
            Err(e) => {
                info!("could not write preview: {e}");
                session.preview = None;
            }
        }
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.set_message("Creating cards...");
    spinner.enable_steady_tick(Duration::from_millis(100));

    let status = workflow::run(image, &config, service, timestamp);
    spinner.finish_and_clear();
    Ok(status)
}

fn choose_source(session: &mut Session) -> Result<()> {
    let sources = [ImageSource::Clipboard, ImageSource::File];
    let labels: Vec<&str> = sources.iter().map(|s| s.label()).collect();
    let current = sources.iter().position(|s| *s == session.source).unwrap_or(0);
    let selection = Select::new()
        .with_prompt("Input source")
        .items(&labels)
        .default(current)
        .interact()?;
    session.source = sources[selection];
    Ok(())
}

fn edit_deck_and_tags(session: &mut Session) -> Result<()> {
    let current = session
        .decks
        .iter()
        .position(|d| *d == session.deck)
        .unwrap_or(0);
    let selection = Select::new()
        .with_prompt("Select deck")
        .items(&session.decks)
        .default(current)
        .interact()?;
    session.deck = session.decks[selection].clone();

    session.tags = Input::new()
        .with_prompt("Tags (comma-separated)")
        .with_initial_text(session.tags.clone())
        .allow_empty(true)
        .interact_text()?;
    Ok(())
}

fn edit_stripes(session: &mut Session) -> Result<()> {
    session.color = Input::new()
        .with_prompt("Stripe color (hex)")
        .default(session.color.clone())
        .validate_with(|c: &String| -> std::result::Result<(), String> {
            parse_hex_color(c).map(|_| ()).map_err(|e| e.to_string())
        })
        .interact_text()?;

    session.width_percent = Input::new()
        .with_prompt(format!("Stripe width (1-{MAX_WIDTH_PERCENT}%)"))
        .default(session.width_percent)
        .validate_with(|w: &u8| -> std::result::Result<(), String> {
            if (1..=MAX_WIDTH_PERCENT).contains(w) {
                Ok(())
            } else {
                Err(format!("must be between 1 and {MAX_WIDTH_PERCENT}"))
            }
        })
        .interact_text()?;

    for (i, count) in session.stripe_counts.iter_mut().enumerate() {
        *count = Input::new()
            .with_prompt(format!("Card {} - number of stripes", i + 1))
            .default(*count)
            .validate_with(|n: &u32| -> std::result::Result<(), String> {
                if (1..=MAX_STRIPES).contains(n) {
                    Ok(())
                } else {
                    Err(format!("must be between 1 and {MAX_STRIPES}"))
                }
            })
            .interact_text()?;
    }
    Ok(())
}

fn print_summary(session: &Session) {
    let counts: Vec<String> = session.stripe_counts.iter().map(u32::to_string).collect();
    println!();
    println!(
        "{} {} | deck: {} | tags: {}",
        "Source:".bold(),
        session.source.label(),
        session.deck,
        if session.tags.trim().is_empty() {
            "-"
        } else {
            session.tags.as_str()
        }
    );
    println!(
        "{} {} at {}% | cards: {}",
        "Stripes:".bold(),
        session.color,
        session.width_percent,
        counts.join(", ")
    );
}

fn print_status(status: &Status) {
    if status.is_success() {
        println!("{}", status.to_string().green());
    } else {
        println!("{}", status.to_string().red());
    }
}
