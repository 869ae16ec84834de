// Library root
// -----------
// Overlays vertical stripes on an image and turns the striped variants into
// flashcards through a local AnkiConnect service. The binary (`main.rs`)
// wires these modules to the interactive terminal front end.
//
// Module responsibilities:
// - `stripes`: stripe layout and rendering.
// - `acquire`: clipboard and file image sources, PNG/base64 helpers.
// - `api`: the flashcard service trait and its HTTP client.
// - `config`: environment settings and the per-run configuration.
// - `workflow`: plans a run and drives the uploads.
// - `ui`: terminal menus and status output.
pub mod acquire;
pub mod api;
pub mod config;
pub mod error;
pub mod stripes;
pub mod ui;
pub mod workflow;
