// Flashcard service client: a small blocking HTTP client that speaks the
// AnkiConnect JSON protocol. Every call is one POST of
// `{action, version, params}` answered by `{result, error}`.

use crate::error::ServiceError;
use log::{debug, warn};
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version sent with every request.
pub const API_VERSION: u32 = 6;

/// Default address of the local AnkiConnect add-on.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8765";

/// Operations the workflow needs from the flashcard application. The HTTP
/// client implements it; tests substitute an in-memory recorder.
pub trait FlashcardService {
    /// Upload a base64 encoded blob to the media store under `filename` and
    /// return the name the service stored it as.
    fn store_media(&self, filename: &str, base64_data: &str) -> Result<String, ServiceError>;

    /// Create a note and return its id.
    fn add_note(&self, note: &Note) -> Result<i64, ServiceError>;

    fn deck_names(&self) -> Result<Vec<String>, ServiceError>;

    /// Whether the service answers at all.
    fn is_reachable(&self) -> bool;
}

/// Deck names for the selection prompt. Deck listing only seeds a menu, so
/// any failure is logged and replaced by a single fallback deck.
pub fn list_decks(service: &dyn FlashcardService, fallback: &str) -> Vec<String> {
    match service.deck_names() {
        Ok(decks) if !decks.is_empty() => decks,
        Ok(_) => vec![fallback.to_string()],
        Err(e) => {
            warn!("could not fetch deck names, using `{fallback}`: {e}");
            vec![fallback.to_string()]
        }
    }
}

/// Request envelope. `params` is left out for parameterless actions.
#[derive(Serialize, Debug)]
pub struct Request<'a, P: Serialize> {
    pub action: &'a str,
    pub version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<P>,
}

/// Response envelope. `error` is null on success.
#[derive(Deserialize, Debug)]
pub struct Response<T> {
    pub result: Option<T>,
    pub error: Option<String>,
}

impl<T> Response<T> {
    /// Turn the envelope into the result, mapping a non-null `error` to
    /// `ServiceError::Remote`.
    pub fn into_result(self, action: &str) -> Result<T, ServiceError> {
        if let Some(message) = self.error {
            return Err(ServiceError::Remote {
                action: action.to_string(),
                message,
            });
        }
        self.result.ok_or_else(|| ServiceError::Response {
            action: action.to_string(),
            message: "missing result".into(),
        })
    }
}

#[derive(Serialize, Debug)]
struct StoreMediaParams<'a> {
    filename: &'a str,
    data: &'a str,
}

#[derive(Serialize, Debug)]
struct AddNoteParams<'a> {
    note: &'a Note,
}

/// A two-field note as submitted to `addNote`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub deck_name: String,
    pub model_name: String,
    pub fields: NoteFields,
    pub options: NoteOptions,
    pub tags: Vec<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct NoteFields {
    #[serde(rename = "Front")]
    pub front: String,
    #[serde(rename = "Back")]
    pub back: String,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoteOptions {
    pub allow_duplicate: bool,
}

impl Note {
    pub fn new(deck: &str, model: &str, front: String, back: String, tags: Vec<String>) -> Self {
        Note {
            deck_name: deck.to_string(),
            model_name: model.to_string(),
            fields: NoteFields { front, back },
            options: NoteOptions {
                allow_duplicate: false,
            },
            tags,
        }
    }
}

/// Blocking HTTP client for the flashcard service.
#[derive(Clone)]
pub struct HttpFlashcardClient {
    client: Client,
    url: String,
}

impl HttpFlashcardClient {
    pub fn new(url: impl Into<String>) -> Self {
        HttpFlashcardClient {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// POST one action and decode its `result`.
    fn invoke<P, T>(&self, action: &str, params: Option<P>) -> Result<T, ServiceError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        debug!("invoking `{action}` on {}", self.url);
        let request = Request {
            action,
            version: API_VERSION,
            params,
        };
        let request_error = |error: reqwest::Error| ServiceError::Request {
            action: action.to_string(),
            error,
        };

        let res = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .map_err(request_error)?;
        let response: Response<T> = res.json().map_err(request_error)?;
        response.into_result(action)
    }
}

impl FlashcardService for HttpFlashcardClient {
    fn store_media(&self, filename: &str, base64_data: &str) -> Result<String, ServiceError> {
        self.invoke(
            "storeMediaFile",
            Some(StoreMediaParams {
                filename,
                data: base64_data,
            }),
        )
    }

    fn add_note(&self, note: &Note) -> Result<i64, ServiceError> {
        self.invoke("addNote", Some(AddNoteParams { note }))
    }

    fn deck_names(&self) -> Result<Vec<String>, ServiceError> {
        self.invoke::<(), _>("deckNames", None)
    }

    fn is_reachable(&self) -> bool {
        match self.invoke::<(), Value>("version", None) {
            Ok(version) => {
                debug!("service reachable, version {version}");
                true
            }
            Err(e) => {
                debug!("service not reachable: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn add_note_request_matches_wire_shape() {
        let note = Note::new(
            "Default",
            "Basic",
            "<img src='stripes_3_1.png'>".into(),
            "<p>Original Image:</p><img src='original_image_1.png'>".into(),
            vec!["art".into()],
        );
        let request = Request {
            action: "addNote",
            version: API_VERSION,
            params: Some(AddNoteParams { note: &note }),
        };

        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "action": "addNote",
                "version": 6,
                "params": {
                    "note": {
                        "deckName": "Default",
                        "modelName": "Basic",
                        "fields": {
                            "Front": "<img src='stripes_3_1.png'>",
                            "Back": "<p>Original Image:</p><img src='original_image_1.png'>"
                        },
                        "options": { "allowDuplicate": false },
                        "tags": ["art"]
                    }
                }
            })
        );
    }

    #[test]
    fn parameterless_request_omits_params() {
        let request = Request::<()> {
            action: "deckNames",
            version: API_VERSION,
            params: None,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "action": "deckNames", "version": 6 })
        );
    }

    #[test]
    fn store_media_params_use_filename_and_data() {
        let params = StoreMediaParams {
            filename: "a.png",
            data: "QUJD",
        };
        assert_eq!(
            serde_json::to_value(&params).unwrap(),
            json!({ "filename": "a.png", "data": "QUJD" })
        );
    }

    #[test]
    fn response_error_field_becomes_remote_error() {
        let response: Response<i64> = serde_json::from_value(json!({
            "result": null,
            "error": "cannot create note because it is a duplicate"
        }))
        .unwrap();
        match response.into_result("addNote") {
            Err(ServiceError::Remote { action, message }) => {
                assert_eq!(action, "addNote");
                assert!(message.contains("duplicate"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn response_result_is_returned() {
        let response: Response<Vec<String>> =
            serde_json::from_value(json!({ "result": ["Default", "Art"], "error": null })).unwrap();
        assert_eq!(response.into_result("deckNames").unwrap(), vec!["Default", "Art"]);
    }

    #[test]
    fn unreachable_service_falls_back_to_default_deck() {
        // Bind then drop a listener so the port is known to be closed.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = HttpFlashcardClient::new(format!("http://127.0.0.1:{port}"));

        assert!(!client.is_reachable());
        let error = client.deck_names().unwrap_err();
        assert!(matches!(error, ServiceError::Request { .. }));
        assert!(std::error::Error::source(&error).is_some());
        assert_eq!(
            list_decks(&client, "Image Stripes Deck"),
            vec!["Image Stripes Deck".to_string()]
        );
    }
}
