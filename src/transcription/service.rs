use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Deepgram pre-recorded listen endpoint.
const LISTEN_URL: &str = "https://api.deepgram.com/v1/listen";

/// Whole-request timeout. A hung request would stall the strictly-ordered
/// worker, so the call is bounded.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Options applied to every transcription request.
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// API credential for the transcription service.
    pub api_key: String,
    /// Recognition model identifier.
    pub model: String,
}

/// Errors from one transcription attempt.
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// No credential is configured yet.
    #[error("no transcription credential configured")]
    MissingCredential,

    /// The service rejected the configured credential.
    #[error("transcription service rejected the configured credential (HTTP {status})")]
    Credential {
        /// HTTP status returned by the service.
        status: u16,
    },

    /// The request could not be sent or the connection failed.
    #[error("transcription request failed: {0}")]
    Network(String),

    /// The service answered with a non-success status.
    #[error("transcription service returned HTTP {status}: {message}")]
    Http {
        /// HTTP status returned by the service.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// The response body could not be decoded into a transcript.
    #[error("malformed transcription response: {0}")]
    MalformedResponse(String),
}

/// Trait for transcription operations (enables testing via mocking).
///
/// Production code uses [`DeepgramTranscriber`]; tests stub this seam with
/// `MockTranscriber` (via `mockall`) or a hand-rolled scripted impl.
#[cfg_attr(test, mockall::automock)]
pub trait Transcriber: Send + Sync {
    /// Transcribes one recorded audio container and returns the transcript.
    ///
    /// # Errors
    /// Returns error on credential rejection, network failure, non-success
    /// HTTP status, or an undecodable response.
    fn transcribe(&self, audio: &[u8]) -> Result<String, TranscribeError>;
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: ListenResults,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    channels: Vec<ChannelResult>,
}

#[derive(Debug, Deserialize)]
struct ChannelResult {
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    transcript: String,
}

/// Client for the Deepgram pre-recorded transcription API.
///
/// Every request asks for punctuation and language detection and names the
/// configured model; the transcript is the first alternative of the first
/// channel. The blocking HTTP client is built on first use from the worker
/// thread, and each call runs on that client's own short-lived
/// single-threaded runtime, torn down when the call returns.
pub struct DeepgramTranscriber {
    client: OnceLock<Client>,
    options: Mutex<ServiceOptions>,
}

impl DeepgramTranscriber {
    /// Creates the client handle with the given credential and model.
    ///
    /// An empty credential is accepted here and surfaces as
    /// [`TranscribeError::MissingCredential`] on first use.
    #[must_use]
    pub fn new(options: ServiceOptions) -> Self {
        info!(model = %options.model, "transcription client ready");
        Self {
            client: OnceLock::new(),
            options: Mutex::new(options),
        }
    }

    fn client(&self) -> Result<&Client, TranscribeError> {
        if let Some(client) = self.client.get() {
            return Ok(client);
        }
        let built = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| TranscribeError::Network(e.to_string()))?;
        Ok(self.client.get_or_init(|| built))
    }

    /// Replaces the credential and model without restarting the worker.
    pub fn update_options(&self, options: ServiceOptions) {
        info!(model = %options.model, "transcription options updated");
        *self
            .options
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = options;
    }

    fn current_options(&self) -> ServiceOptions {
        self.options
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Transcriber for DeepgramTranscriber {
    fn transcribe(&self, audio: &[u8]) -> Result<String, TranscribeError> {
        let options = self.current_options();
        if options.api_key.trim().is_empty() {
            return Err(TranscribeError::MissingCredential);
        }

        debug!(bytes = audio.len(), model = %options.model, "submitting recording");

        let response = self
            .client()?
            .post(LISTEN_URL)
            .query(&[
                ("punctuate", "true"),
                ("detect_language", "true"),
                ("model", options.model.as_str()),
            ])
            .header("Authorization", format!("Token {}", options.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio.to_vec())
            .send()
            .map_err(|e| TranscribeError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(TranscribeError::Credential {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(TranscribeError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: ListenResponse = response
            .json()
            .map_err(|e| TranscribeError::MalformedResponse(e.to_string()))?;

        first_transcript(body)
    }
}

/// Extracts the first alternative of the first channel.
fn first_transcript(response: ListenResponse) -> Result<String, TranscribeError> {
    response
        .results
        .channels
        .into_iter()
        .next()
        .and_then(|channel| channel.alternatives.into_iter().next())
        .map(|alternative| alternative.transcript)
        .ok_or_else(|| {
            TranscribeError::MalformedResponse("response contained no alternatives".to_owned())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<String, TranscribeError> {
        let response: ListenResponse =
            serde_json::from_str(body).map_err(|e| TranscribeError::MalformedResponse(e.to_string()))?;
        first_transcript(response)
    }

    #[test]
    fn extracts_first_channel_first_alternative() {
        let body = r#"{
            "results": {
                "channels": [
                    {"alternatives": [
                        {"transcript": "hello world", "confidence": 0.99},
                        {"transcript": "hollow word", "confidence": 0.41}
                    ]},
                    {"alternatives": [{"transcript": "other channel"}]}
                ]
            }
        }"#;
        assert_eq!(parse(body).unwrap(), "hello world");
    }

    #[test]
    fn empty_transcript_is_not_an_error() {
        let body = r#"{"results": {"channels": [{"alternatives": [{"transcript": ""}]}]}}"#;
        assert_eq!(parse(body).unwrap(), "");
    }

    #[test]
    fn missing_channels_is_malformed() {
        let body = r#"{"results": {"channels": []}}"#;
        assert!(matches!(
            parse(body),
            Err(TranscribeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn missing_alternatives_is_malformed() {
        let body = r#"{"results": {"channels": [{"alternatives": []}]}}"#;
        assert!(matches!(
            parse(body),
            Err(TranscribeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn non_json_body_is_malformed() {
        assert!(matches!(
            parse("not json"),
            Err(TranscribeError::MalformedResponse(_))
        ));
    }

    #[test]
    fn empty_credential_fails_before_any_request() {
        let client = DeepgramTranscriber::new(ServiceOptions {
            api_key: String::new(),
            model: "nova-3".to_owned(),
        });

        assert!(matches!(
            client.transcribe(b"RIFF"),
            Err(TranscribeError::MissingCredential)
        ));
    }

    #[test]
    fn update_options_swaps_credential_and_model() {
        let client = DeepgramTranscriber::new(ServiceOptions {
            api_key: "old".to_owned(),
            model: "nova-3".to_owned(),
        });

        client.update_options(ServiceOptions {
            api_key: String::new(),
            model: "general".to_owned(),
        });

        // The blanked credential takes effect on the next call.
        assert!(matches!(
            client.transcribe(b"RIFF"),
            Err(TranscribeError::MissingCredential)
        ));
        assert_eq!(client.current_options().model, "general");
    }

    #[test]
    fn credential_error_names_the_status() {
        let err = TranscribeError::Credential { status: 401 };
        assert!(err.to_string().contains("401"));
    }
}
