// Workflow orchestration. `plan_run` is pure: it renders every variant and
// builds the media uploads and notes. `execute` performs the uploads in card
// order against a `FlashcardService` and stops at the first failure.

use crate::acquire::encode_png_base64;
use crate::api::{FlashcardService, Note};
use crate::config::RunConfig;
use crate::error::{AcquisitionError, RenderError, ServiceError, WorkflowError};
use crate::stripes::render_stripes;
use image::RgbaImage;
use log::{info, warn};
use std::collections::HashMap;
use std::fmt;

/// One blob for the media store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaUpload {
    pub filename: String,
    pub data: String,
}

/// Everything needed to create one card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardPlan {
    pub stripe_count: u32,
    pub media: MediaUpload,
    pub note: Note,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPlan {
    pub original: MediaUpload,
    pub cards: Vec<CardPlan>,
}

/// What `execute` managed to do. Uploads made before a failure stay in place.
#[derive(Debug, Default)]
pub struct RunReport {
    pub stored_media: Vec<String>,
    pub note_ids: Vec<i64>,
    pub total_cards: usize,
    pub error: Option<ServiceError>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.note_ids.len() == self.total_cards
    }
}

/// Outcome of a run as shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    NoImage,
    AcquisitionFailed(String),
    RenderFailed(String),
    Created(usize),
    UploadFailed {
        created: usize,
        total: usize,
        message: String,
    },
}

impl Status {
    pub fn is_success(&self) -> bool {
        matches!(self, Status::Created(_))
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::NoImage => write!(f, "No image loaded."),
            Status::AcquisitionFailed(msg) => write!(f, "Could not load image: {msg}"),
            Status::RenderFailed(msg) => write!(f, "Image processing failed: {msg}"),
            Status::Created(n) => write!(f, "Created {n} cards."),
            Status::UploadFailed {
                created,
                total,
                message,
            } => write!(
                f,
                "Card creation failed after {created} of {total} cards: {message}"
            ),
        }
    }
}

impl From<&WorkflowError> for Status {
    fn from(error: &WorkflowError) -> Self {
        match error {
            WorkflowError::Acquisition(AcquisitionError::NoImage) => Status::NoImage,
            WorkflowError::Acquisition(e) => Status::AcquisitionFailed(e.to_string()),
            WorkflowError::Render(e) => Status::RenderFailed(e.to_string()),
        }
    }
}

impl From<&RunReport> for Status {
    fn from(report: &RunReport) -> Self {
        match &report.error {
            None => Status::Created(report.note_ids.len()),
            Some(e) => Status::UploadFailed {
                created: report.note_ids.len(),
                total: report.total_cards,
                message: e.to_string(),
            },
        }
    }
}

/// Seconds since the Unix epoch, captured once per run to name its media.
pub fn run_timestamp() -> i64 {
    chrono::Utc::now().timestamp()
}

pub fn original_filename(timestamp: i64) -> String {
    format!("original_image_{timestamp}.png")
}

/// Media filenames for each stripe job. A count that repeats within the run
/// gets a `_2`, `_3`, ... suffix so no two uploads share a name.
pub fn variant_filenames(stripe_counts: &[u32], timestamp: i64) -> Vec<String> {
    let mut seen: HashMap<u32, usize> = HashMap::new();
    stripe_counts
        .iter()
        .map(|&n| {
            let k = seen.entry(n).or_insert(0);
            *k += 1;
            if *k == 1 {
                format!("stripes_{n}_{timestamp}.png")
            } else {
                format!("stripes_{n}_{timestamp}_{k}.png")
            }
        })
        .collect()
}

pub fn front_html(striped_filename: &str) -> String {
    format!("<img src='{striped_filename}'>")
}

pub fn back_html(original_filename: &str) -> String {
    format!("<p>Original Image:</p><img src='{original_filename}'>")
}

/// Render every stripe job and build the uploads. Any render failure aborts
/// before anything is built, so a broken set is never uploaded.
pub fn plan_run(
    original: &RgbaImage,
    config: &RunConfig,
    timestamp: i64,
) -> Result<RunPlan, RenderError> {
    let variants = config
        .stripe_counts
        .iter()
        .map(|&n| render_stripes(original, n, &config.style))
        .collect::<Result<Vec<_>, _>>()?;

    let original = MediaUpload {
        filename: original_filename(timestamp),
        data: encode_png_base64(original)?,
    };
    let back = back_html(&original.filename);

    let filenames = variant_filenames(&config.stripe_counts, timestamp);
    let mut cards = Vec::with_capacity(variants.len());
    for ((&stripe_count, filename), image) in
        config.stripe_counts.iter().zip(filenames).zip(&variants)
    {
        let note = Note::new(
            &config.deck,
            &config.model,
            front_html(&filename),
            back.clone(),
            config.tags.clone(),
        );
        cards.push(CardPlan {
            stripe_count,
            media: MediaUpload {
                filename,
                data: encode_png_base64(image)?,
            },
            note,
        });
    }

    Ok(RunPlan { original, cards })
}

/// Upload the original, then each card's media and note in order. The first
/// service error ends the run; nothing already created is rolled back.
pub fn execute(plan: &RunPlan, service: &dyn FlashcardService) -> RunReport {
    let mut report = RunReport {
        total_cards: plan.cards.len(),
        ..RunReport::default()
    };

    if let Err(e) = upload_all(plan, service, &mut report) {
        warn!(
            "run stopped after {} of {} cards: {e}",
            report.note_ids.len(),
            report.total_cards
        );
        report.error = Some(e);
    }
    report
}

fn upload_all(
    plan: &RunPlan,
    service: &dyn FlashcardService,
    report: &mut RunReport,
) -> Result<(), ServiceError> {
    let stored = service.store_media(&plan.original.filename, &plan.original.data)?;
    report.stored_media.push(stored);

    for card in &plan.cards {
        let stored = service.store_media(&card.media.filename, &card.media.data)?;
        report.stored_media.push(stored);

        let id = service.add_note(&card.note)?;
        info!("created note {id} with {} stripes", card.stripe_count);
        report.note_ids.push(id);
    }
    Ok(())
}

/// Turn an acquired image into a ready-to-upload plan.
pub fn prepare(
    image: Result<RgbaImage, AcquisitionError>,
    config: &RunConfig,
    timestamp: i64,
) -> Result<RunPlan, WorkflowError> {
    let image = image?;
    Ok(plan_run(&image, config, timestamp)?)
}

/// Full run: acquired image to status line.
pub fn run(
    image: Result<RgbaImage, AcquisitionError>,
    config: &RunConfig,
    service: &dyn FlashcardService,
    timestamp: i64,
) -> Status {
    let plan = match prepare(image, config, timestamp) {
        Ok(plan) => plan,
        Err(e) => {
            warn!("run aborted before upload: {e}");
            return Status::from(&e);
        }
    };
    let report = execute(&plan, service);
    Status::from(&report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunConfig;
    use image::Rgba;

    fn config(counts: &[u32]) -> RunConfig {
        RunConfig::new("Deck", "Basic", "art, test", "#ff0000", 5, counts).unwrap()
    }

    fn image() -> RgbaImage {
        RgbaImage::from_pixel(200, 50, Rgba([255, 255, 255, 255]))
    }

    #[test]
    fn filenames_share_the_run_timestamp() {
        assert_eq!(original_filename(1700), "original_image_1700.png");
        assert_eq!(
            variant_filenames(&[3, 6, 10], 1700),
            vec![
                "stripes_3_1700.png",
                "stripes_6_1700.png",
                "stripes_10_1700.png"
            ]
        );
    }

    #[test]
    fn repeated_counts_get_distinct_filenames() {
        assert_eq!(
            variant_filenames(&[4, 4, 7, 4], 9),
            vec![
                "stripes_4_9.png",
                "stripes_4_9_2.png",
                "stripes_7_9.png",
                "stripes_4_9_3.png"
            ]
        );
    }

    #[test]
    fn plan_builds_one_card_per_job() {
        let plan = plan_run(&image(), &config(&[3, 6, 10]), 42).unwrap();

        assert_eq!(plan.original.filename, "original_image_42.png");
        assert_eq!(plan.cards.len(), 3);
        for (card, n) in plan.cards.iter().zip([3, 6, 10]) {
            assert_eq!(card.stripe_count, n);
            assert_eq!(card.note.fields.front, format!("<img src='stripes_{n}_42.png'>"));
            assert_eq!(
                card.note.fields.back,
                "<p>Original Image:</p><img src='original_image_42.png'>"
            );
            assert_eq!(card.note.tags, vec!["art", "test"]);
            assert!(!card.note.options.allow_duplicate);
            assert_ne!(card.media.data, plan.original.data);
        }
    }

    #[test]
    fn no_image_maps_to_no_image_status() {
        struct Unused;
        impl FlashcardService for Unused {
            fn store_media(&self, _: &str, _: &str) -> Result<String, ServiceError> {
                panic!("nothing should be uploaded")
            }
            fn add_note(&self, _: &Note) -> Result<i64, ServiceError> {
                panic!("nothing should be uploaded")
            }
            fn deck_names(&self) -> Result<Vec<String>, ServiceError> {
                Ok(vec![])
            }
            fn is_reachable(&self) -> bool {
                true
            }
        }

        let status = run(Err(AcquisitionError::NoImage), &config(&[3]), &Unused, 1);
        assert_eq!(status, Status::NoImage);
        assert_eq!(status.to_string(), "No image loaded.");
    }

    #[test]
    fn status_messages() {
        assert_eq!(Status::Created(3).to_string(), "Created 3 cards.");
        assert!(Status::Created(3).is_success());
        let failed = Status::UploadFailed {
            created: 1,
            total: 3,
            message: "boom".into(),
        };
        assert_eq!(
            failed.to_string(),
            "Card creation failed after 1 of 3 cards: boom"
        );
        assert!(!failed.is_success());
    }

    #[test]
    fn prepare_reports_render_failure_before_any_upload() {
        let mut cfg = config(&[3, 6]);
        cfg.stripe_counts = vec![3, 0];

        let error = prepare(Ok(image()), &cfg, 1).unwrap_err();
        assert!(matches!(
            error,
            WorkflowError::Render(RenderError::InvalidCount(0))
        ));
        assert!(matches!(Status::from(&error), Status::RenderFailed(_)));

        let error = prepare(Err(AcquisitionError::NoImage), &cfg, 1).unwrap_err();
        assert_eq!(Status::from(&error), Status::NoImage);
    }
}
