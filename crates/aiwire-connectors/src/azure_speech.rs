//! Azure AI Speech REST endpoints: text-to-speech and short-audio speech-to-text.

use std::time::Duration;

use serde::Deserialize;
use tracing::info;

use crate::error::{ConnectorError, ConnectorResult, check_status};
use crate::http::{build_client, trim_base};

pub const DEFAULT_VOICE: &str = "en-US-JennyNeural";
pub const OUTPUT_FORMAT: &str = "riff-24khz-16bit-mono-pcm";
const WAV_CONTENT_TYPE: &str = "audio/wav; codecs=audio/pcm; samplerate=16000";
const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Speech service configuration.
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub key: String,
    pub region: String,
    /// Overrides the regional hosts, e.g. for a private endpoint or proxy.
    pub endpoint: Option<String>,
    pub voice: String,
    pub timeout_secs: u64,
}

impl SpeechConfig {
    pub fn new(key: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            region: region.into(),
            endpoint: None,
            voice: DEFAULT_VOICE.to_string(),
            timeout_secs: 30,
        }
    }

    /// Read `AZURE_SPEECH_KEY` and `AZURE_SPEECH_REGION`, plus optional
    /// `AZURE_SPEECH_ENDPOINT` and `AZURE_SPEECH_VOICE`.
    pub fn from_env() -> Option<Self> {
        let key = std::env::var("AZURE_SPEECH_KEY").ok()?;
        let region = std::env::var("AZURE_SPEECH_REGION").ok()?;
        let mut config = Self::new(key, region);
        config.endpoint = std::env::var("AZURE_SPEECH_ENDPOINT").ok();
        if let Ok(voice) = std::env::var("AZURE_SPEECH_VOICE") {
            config.voice = voice;
        }
        Some(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }
}

/// Result of a speech-to-text call.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    /// Start of recognized speech within the audio.
    pub offset: Duration,
    pub duration: Duration,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecognitionResponse {
    recognition_status: String,
    display_text: Option<String>,
    /// 100-nanosecond ticks.
    #[serde(default)]
    offset: u64,
    #[serde(default)]
    duration: u64,
}

/// Client for the Speech REST API.
pub struct SpeechClient {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl SpeechClient {
    pub fn new(config: SpeechConfig) -> ConnectorResult<Self> {
        if config.key.is_empty() {
            return Err(ConnectorError::Config("Azure Speech key is empty".into()));
        }
        if config.region.is_empty() && config.endpoint.is_none() {
            return Err(ConnectorError::Config(
                "Azure Speech needs a region or an endpoint".into(),
            ));
        }
        let client = build_client(config.timeout_secs)?;
        Ok(Self { client, config })
    }

    fn tts_url(&self) -> String {
        match &self.config.endpoint {
            Some(base) => format!("{}/cognitiveservices/v1", trim_base(base)),
            None => format!(
                "https://{}.tts.speech.microsoft.com/cognitiveservices/v1",
                self.config.region
            ),
        }
    }

    fn stt_url(&self) -> String {
        let path = "speech/recognition/conversation/cognitiveservices/v1";
        match &self.config.endpoint {
            Some(base) => format!("{}/{path}", trim_base(base)),
            None => format!("https://{}.stt.speech.microsoft.com/{path}", self.config.region),
        }
    }

    /// Synthesize `text` and return RIFF/WAV audio bytes.
    ///
    /// `voice` falls back to the configured default voice.
    pub async fn synthesize(&self, text: &str, voice: Option<&str>) -> ConnectorResult<Vec<u8>> {
        let voice = voice.unwrap_or(&self.config.voice);
        let url = self.tts_url();

        info!(url = %url, voice, chars = text.len(), "synthesizing speech");
        let resp = self
            .client
            .post(&url)
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.key)
            .header(reqwest::header::CONTENT_TYPE, "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", OUTPUT_FORMAT)
            .header(reqwest::header::USER_AGENT, "aiwire")
            .body(ssml(text, voice))
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let audio = resp.bytes().await?.to_vec();
        info!(bytes = audio.len(), "speech synthesized");
        Ok(audio)
    }

    /// Recognize speech in a 16 kHz mono PCM WAV clip (up to 60 seconds).
    pub async fn recognize(&self, wav: Vec<u8>, language: &str) -> ConnectorResult<Recognition> {
        let url = self.stt_url();

        info!(url = %url, language, bytes = wav.len(), "recognizing speech");
        let resp = self
            .client
            .post(&url)
            .query(&[("language", language), ("format", "simple")])
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.key)
            .header(reqwest::header::CONTENT_TYPE, WAV_CONTENT_TYPE)
            .header(reqwest::header::ACCEPT, "application/json")
            .body(wav)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        let parsed: RecognitionResponse = resp.json().await?;
        into_recognition(parsed)
    }
}

fn into_recognition(resp: RecognitionResponse) -> ConnectorResult<Recognition> {
    if resp.recognition_status != "Success" {
        return Err(ConnectorError::NoMatch(resp.recognition_status));
    }
    Ok(Recognition {
        text: resp.display_text.unwrap_or_default(),
        offset: ticks(resp.offset),
        duration: ticks(resp.duration),
    })
}

fn ticks(t: u64) -> Duration {
    Duration::from_nanos(t.saturating_mul(100))
}

/// SSML document for a single voice. `xml:lang` is taken from the voice
/// name's locale prefix (`en-US-JennyNeural` → `en-US`); a prefix that is not
/// plain ASCII letters, digits and dashes falls back to `en-US`.
pub fn ssml(text: &str, voice: &str) -> String {
    let lang = voice_locale(voice)
        .filter(|l| l.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-'))
        .unwrap_or("en-US");
    format!(
        "<speak version='1.0' xml:lang='{lang}'><voice name='{}'>{}</voice></speak>",
        escape_xml(voice),
        escape_xml(text)
    )
}

fn voice_locale(voice: &str) -> Option<&str> {
    let mut dashes = voice.match_indices('-').map(|(i, _)| i);
    let _first = dashes.next()?;
    let second = dashes.next()?;
    Some(&voice[..second])
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(config: SpeechConfig) -> SpeechClient {
        SpeechClient::new(config).unwrap()
    }

    #[test]
    fn regional_urls() {
        let c = client(SpeechConfig::new("key", "westeurope"));
        assert_eq!(
            c.tts_url(),
            "https://westeurope.tts.speech.microsoft.com/cognitiveservices/v1"
        );
        assert_eq!(
            c.stt_url(),
            "https://westeurope.stt.speech.microsoft.com/speech/recognition/conversation/cognitiveservices/v1"
        );
    }

    #[test]
    fn endpoint_override() {
        let c = client(SpeechConfig::new("key", "").with_endpoint("http://localhost:5000/"));
        assert_eq!(c.tts_url(), "http://localhost:5000/cognitiveservices/v1");
        assert!(c.stt_url().starts_with("http://localhost:5000/speech/"));
    }

    #[test]
    fn missing_region_and_endpoint() {
        assert!(matches!(
            SpeechClient::new(SpeechConfig::new("key", "")),
            Err(ConnectorError::Config(_))
        ));
    }

    #[test]
    fn ssml_escapes_text() {
        let doc = ssml("Fish & chips <b>'now'</b>", "en-GB-SoniaNeural");
        assert!(doc.contains("xml:lang='en-GB'"));
        assert!(doc.contains("<voice name='en-GB-SoniaNeural'>"));
        assert!(doc.contains("Fish &amp; chips &lt;b&gt;&apos;now&apos;&lt;/b&gt;"));
    }

    #[test]
    fn ssml_rejects_markup_in_locale() {
        let doc = ssml("hi", "en'><evil/>-US-X");
        assert!(doc.starts_with("<speak version='1.0' xml:lang='en-US'>"));
        assert!(!doc.contains("<evil/>"));
        assert!(doc.contains("name='en&apos;&gt;&lt;evil/&gt;-US-X'"));
    }

    #[test]
    fn ssml_defaults_locale_for_odd_voice_names() {
        assert!(ssml("hi", "custom").contains("xml:lang='en-US'"));
    }

    #[test]
    fn parses_successful_recognition() {
        let json = r#"{
            "RecognitionStatus": "Success",
            "DisplayText": "Remind me to buy 5 pencils.",
            "Offset": 1800000,
            "Duration": 32100000
        }"#;
        let r = into_recognition(serde_json::from_str(json).unwrap()).unwrap();
        assert_eq!(r.text, "Remind me to buy 5 pencils.");
        assert_eq!(r.offset, Duration::from_millis(180));
        assert_eq!(r.duration, Duration::from_millis(3210));
    }

    #[test]
    fn no_match_is_error() {
        let json = r#"{"RecognitionStatus": "NoMatch", "Offset": 0, "Duration": 0}"#;
        let err = into_recognition(serde_json::from_str(json).unwrap()).unwrap_err();
        assert!(matches!(err, ConnectorError::NoMatch(s) if s == "NoMatch"));
    }

    #[test]
    fn initial_silence_timeout_without_offsets() {
        let json = r#"{"RecognitionStatus": "InitialSilenceTimeout"}"#;
        let err = into_recognition(serde_json::from_str(json).unwrap()).unwrap_err();
        assert!(matches!(err, ConnectorError::NoMatch(_)));
    }
}
