//! Messages exchanged between the background process and UI surfaces.
//!
//! Every message is a JSON object whose `type` field names its kind.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use webmind_capability::SystemCapabilities;
use webmind_runtime::{LifecycleEvent, LifecycleSnapshot};

/// Broadcast from the background process to every listening surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event {
    /// Percentage in `[0, 100]` plus a status line.
    ModelLoadingProgress { progress: f64, message: String },
    #[serde(rename_all = "camelCase")]
    ModelLoaded { model_id: String },
    ModelError { error: String },
}

impl From<&LifecycleEvent> for Event {
    fn from(event: &LifecycleEvent) -> Self {
        match event {
            LifecycleEvent::Progress { percent, message } => Event::ModelLoadingProgress {
                progress: *percent,
                message: message.clone(),
            },
            LifecycleEvent::Loaded { profile_id } => Event::ModelLoaded {
                model_id: profile_id.clone(),
            },
            LifecycleEvent::Error { message } => Event::ModelError {
                error: message.clone(),
            },
        }
    }
}

/// Request sent by a surface to the background process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Request {
    #[serde(rename_all = "camelCase")]
    LoadModel { model_id: String },
    ToggleModel,
    GetModelState,
    UnloadModel,
    Chat { message: String },
    GetCapabilities,
}

impl Request {
    /// Wire names of every request kind.
    pub const TYPES: &'static [&'static str] = &[
        "LOAD_MODEL",
        "TOGGLE_MODEL",
        "GET_MODEL_STATE",
        "UNLOAD_MODEL",
        "CHAT",
        "GET_CAPABILITIES",
    ];
}

/// Reply to a single request.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<LifecycleSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<SystemCapabilities>,
}

impl Response {
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn failure(error: impl ToString) -> Self {
        Self {
            success: false,
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn with_state(mut self, state: LifecycleSnapshot) -> Self {
        self.state = Some(state);
        self
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Invalid request: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Invalid request: missing \"type\" field")]
    MissingType,
}

/// Parse one request.
///
/// Returns `Ok(None)` for a well-formed message of a type this process does
/// not handle; such messages belong to other listeners.
pub fn parse_request(text: &str) -> Result<Option<Request>, ProtocolError> {
    let value: Value = serde_json::from_str(text)?;

    let kind = value
        .get("type")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingType)?;

    if !Request::TYPES.contains(&kind) {
        return Ok(None);
    }

    Ok(Some(serde_json::from_value(value)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_wire_format() {
        let progress = serde_json::to_value(Event::ModelLoadingProgress {
            progress: 42.0,
            message: "Fetching params".to_string(),
        })
        .unwrap();
        assert_eq!(
            progress,
            json!({"type": "MODEL_LOADING_PROGRESS", "progress": 42.0, "message": "Fetching params"})
        );

        let loaded = serde_json::to_value(Event::ModelLoaded {
            model_id: "gemma-2-2b".to_string(),
        })
        .unwrap();
        assert_eq!(loaded, json!({"type": "MODEL_LOADED", "modelId": "gemma-2-2b"}));

        let error = serde_json::to_value(Event::ModelError {
            error: "Unknown model: x".to_string(),
        })
        .unwrap();
        assert_eq!(error, json!({"type": "MODEL_ERROR", "error": "Unknown model: x"}));
    }

    #[test]
    fn test_parse_requests() {
        assert_eq!(
            parse_request(r#"{"type":"LOAD_MODEL","modelId":"phi-3.5-mini"}"#).unwrap(),
            Some(Request::LoadModel {
                model_id: "phi-3.5-mini".to_string()
            })
        );
        assert_eq!(
            parse_request(r#"{"type":"TOGGLE_MODEL"}"#).unwrap(),
            Some(Request::ToggleModel)
        );
        assert_eq!(
            parse_request(r#"{"type":"CHAT","message":"hi"}"#).unwrap(),
            Some(Request::Chat {
                message: "hi".to_string()
            })
        );
    }

    #[test]
    fn test_unknown_type_is_not_ours() {
        assert_eq!(parse_request(r#"{"type":"OPEN_SETTINGS"}"#).unwrap(), None);
    }

    #[test]
    fn test_malformed_requests() {
        assert!(matches!(
            parse_request("not json"),
            Err(ProtocolError::Malformed(_))
        ));
        assert!(matches!(
            parse_request(r#"{"modelId":"gemma-2-2b"}"#),
            Err(ProtocolError::MissingType)
        ));
        // Known type, missing field.
        assert!(matches!(
            parse_request(r#"{"type":"LOAD_MODEL"}"#),
            Err(ProtocolError::Malformed(_))
        ));
    }

    #[test]
    fn test_response_omits_absent_fields() {
        let json = serde_json::to_value(Response::failure("boom")).unwrap();
        assert_eq!(json, json!({"success": false, "error": "boom"}));

        let json = serde_json::to_value(Response::ok()).unwrap();
        assert_eq!(json, json!({"success": true}));
    }

    #[test]
    fn test_event_from_lifecycle() {
        let event = Event::from(&LifecycleEvent::Loaded {
            profile_id: "mistral-7b".to_string(),
        });
        assert_eq!(
            event,
            Event::ModelLoaded {
                model_id: "mistral-7b".to_string()
            }
        );
    }
}
