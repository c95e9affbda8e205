//! The JSON message envelope spoken over the recognition socket.
//!
//! Every message is `{"event": "request" | "response", "data": …}`.
//! Requests carry the streaming config, base64-encoded audio, or the
//! literal string `"EOF"`; responses carry recognition results.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use streamscribe_core::{RecognitionUpdate, SessionError, SessionSettings};

pub const EOF_MARKER: &str = "EOF";
pub const ENCODING: &str = "LINEAR16";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum Envelope {
    Request(RequestData),
    Response(ResponseData),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum RequestData {
    Config {
        #[serde(rename = "streamingConfig")]
        streaming_config: StreamingConfig,
    },
    Audio {
        #[serde(rename = "audioContent")]
        audio_content: String,
    },
    Eof(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StreamingConfig {
    pub config: RecognitionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionConfig {
    pub language_code: String,
    pub sample_rate_hertz: u32,
    pub encoding: String,
    pub enable_automatic_punctuation: bool,
    pub single_utterance: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResponseData {
    #[serde(default)]
    pub results: Vec<RecognitionResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionResult {
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alternative {
    pub transcript: String,
}

impl Envelope {
    /// The configuration request, sent exactly once per session before
    /// any audio.
    pub fn config(settings: &SessionSettings) -> Self {
        Envelope::Request(RequestData::Config {
            streaming_config: StreamingConfig {
                config: RecognitionConfig {
                    language_code: settings.language.clone(),
                    sample_rate_hertz: settings.sample_rate,
                    encoding: ENCODING.to_string(),
                    enable_automatic_punctuation: settings.punctuation,
                    single_utterance: settings.single_utterance,
                },
            },
        })
    }

    pub fn audio(samples: &[i16]) -> Self {
        Envelope::Request(RequestData::Audio {
            audio_content: encode_pcm(samples),
        })
    }

    pub fn eof() -> Self {
        Envelope::Request(RequestData::Eof(EOF_MARKER.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SessionError> {
        serde_json::to_string(self).map_err(|e| SessionError::ProtocolError(e.to_string()))
    }

    pub fn parse(text: &str) -> Result<Self, SessionError> {
        serde_json::from_str(text).map_err(|e| SessionError::ProtocolError(e.to_string()))
    }
}

impl ResponseData {
    /// Extract one update per result, taking the first alternative.
    /// Results without alternatives are skipped.
    pub fn updates(&self) -> Vec<RecognitionUpdate> {
        self.results
            .iter()
            .filter_map(|result| {
                result.alternatives.first().map(|alt| RecognitionUpdate {
                    text: alt.transcript.clone(),
                    is_final: result.is_final,
                })
            })
            .collect()
    }
}

/// PCM16LE bytes, base64-encoded for the text-safe wire.
pub fn encode_pcm(samples: &[i16]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    BASE64.encode(bytes)
}

pub fn decode_pcm(encoded: &str) -> Result<Vec<i16>, SessionError> {
    let bytes = BASE64
        .decode(encoded)
        .map_err(|e| SessionError::ProtocolError(e.to_string()))?;
    if bytes.len() % 2 != 0 {
        return Err(SessionError::ProtocolError(
            "odd byte count for PCM16 content".to_string(),
        ));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SessionSettings {
        SessionSettings::default()
    }

    #[test]
    fn test_config_envelope_wire_shape() {
        let json = Envelope::config(&settings()).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"event":"request","data":{"streamingConfig":{"config":{"languageCode":"zh-HK","sampleRateHertz":16000,"encoding":"LINEAR16","enableAutomaticPunctuation":true,"singleUtterance":false}}}}"#
        );
    }

    #[test]
    fn test_audio_envelope_wire_shape() {
        let json = Envelope::audio(&[0, 1]).to_json().unwrap();
        let b64 = encode_pcm(&[0, 1]);
        assert_eq!(
            json,
            format!(r#"{{"event":"request","data":{{"audioContent":"{}"}}}}"#, b64)
        );
    }

    #[test]
    fn test_eof_envelope_wire_shape() {
        let json = Envelope::eof().to_json().unwrap();
        assert_eq!(json, r#"{"event":"request","data":"EOF"}"#);
    }

    #[test]
    fn test_parse_response_with_results() {
        let json = r#"{"event":"response","data":{"results":[{"isFinal":true,"alternatives":[{"transcript":"hello"},{"transcript":"hallo"}]}]}}"#;
        let envelope = Envelope::parse(json).unwrap();
        let Envelope::Response(response) = envelope else {
            panic!("expected response");
        };
        let updates = response.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].text, "hello");
        assert!(updates[0].is_final);
    }

    #[test]
    fn test_parse_response_interim_and_final_mix() {
        let json = r#"{"event":"response","data":{"results":[
            {"isFinal":false,"alternatives":[{"transcript":"he"}]},
            {"isFinal":true,"alternatives":[{"transcript":"hello"}]}
        ]}}"#;
        let Envelope::Response(response) = Envelope::parse(json).unwrap() else {
            panic!("expected response");
        };
        let updates = response.updates();
        assert_eq!(updates.len(), 2);
        assert!(!updates[0].is_final);
        assert_eq!(updates[0].text, "he");
        assert!(updates[1].is_final);
        assert_eq!(updates[1].text, "hello");
    }

    #[test]
    fn test_parse_response_empty_results() {
        let json = r#"{"event":"response","data":{"results":[]}}"#;
        let Envelope::Response(response) = Envelope::parse(json).unwrap() else {
            panic!("expected response");
        };
        assert!(response.updates().is_empty());
    }

    #[test]
    fn test_result_without_alternatives_is_skipped() {
        let json = r#"{"event":"response","data":{"results":[{"isFinal":true,"alternatives":[]}]}}"#;
        let Envelope::Response(response) = Envelope::parse(json).unwrap() else {
            panic!("expected response");
        };
        assert!(response.updates().is_empty());
    }

    #[test]
    fn test_parse_request_envelope_roundtrip() {
        for envelope in [
            Envelope::config(&settings()),
            Envelope::audio(&[-32768, 0, 32767]),
            Envelope::eof(),
        ] {
            let json = envelope.to_json().unwrap();
            assert_eq!(Envelope::parse(&json).unwrap(), envelope);
        }
    }

    #[test]
    fn test_parse_malformed_json_is_protocol_error() {
        let result = Envelope::parse("{not json");
        match result {
            Err(SessionError::ProtocolError(_)) => {}
            _ => panic!("expected ProtocolError"),
        }
    }

    #[test]
    fn test_parse_unknown_event_is_protocol_error() {
        let result = Envelope::parse(r#"{"event":"notify","data":{}}"#);
        assert!(matches!(result, Err(SessionError::ProtocolError(_))));
    }

    #[test]
    fn test_pcm_roundtrip_recovers_samples() {
        let samples: Vec<i16> = vec![0, 1, -1, 255, -256, i16::MAX, i16::MIN];
        let encoded = encode_pcm(&samples);
        assert_eq!(decode_pcm(&encoded).unwrap(), samples);
    }

    #[test]
    fn test_pcm_encoding_is_little_endian() {
        // 0x0102 must serialize as bytes [0x02, 0x01].
        let encoded = encode_pcm(&[0x0102]);
        let bytes = BASE64.decode(encoded).unwrap();
        assert_eq!(bytes, vec![0x02, 0x01]);
    }

    #[test]
    fn test_decode_pcm_odd_length_rejected() {
        let encoded = BASE64.encode([1u8, 2, 3]);
        assert!(matches!(
            decode_pcm(&encoded),
            Err(SessionError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_decode_pcm_bad_base64_rejected() {
        assert!(matches!(
            decode_pcm("not base64!"),
            Err(SessionError::ProtocolError(_))
        ));
    }
}
