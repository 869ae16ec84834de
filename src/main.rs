// Entrypoint for the application.
// - Keeps `main` small: read settings, create the service client and hand
//   both to the UI loop.

use stripe_cards::{api::HttpFlashcardClient, config::Settings, ui::main_menu};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // `ANKI_CONNECT_URL` overrides the default http://127.0.0.1:8765.
    let settings = Settings::from_env();
    let client = HttpFlashcardClient::new(settings.service_url.clone());
    log::info!("using flashcard service at {}", client.url());

    main_menu(&settings, &client)?;
    Ok(())
}
