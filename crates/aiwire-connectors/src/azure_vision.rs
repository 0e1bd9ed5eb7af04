//! Azure AI Vision image analysis, face attributes only.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ConnectorError, ConnectorResult, check_status};
use crate::http::{build_client, trim_base};

const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const ANALYZE_PATH: &str = "vision/v3.2/analyze";

/// Vision service configuration.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub key: String,
    /// Resource endpoint, e.g. `https://my-vision.cognitiveservices.azure.com`.
    pub endpoint: String,
    pub timeout_secs: u64,
}

impl VisionConfig {
    pub fn new(key: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            endpoint: endpoint.into(),
            timeout_secs: 30,
        }
    }

    /// Read `AZURE_VISION_KEY` and `AZURE_VISION_ENDPOINT`.
    pub fn from_env() -> Option<Self> {
        Some(Self::new(
            std::env::var("AZURE_VISION_KEY").ok()?,
            std::env::var("AZURE_VISION_ENDPOINT").ok()?,
        ))
    }
}

/// Bounding box in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaceRectangle {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// One detected face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Face {
    pub age: u32,
    pub gender: String,
    #[serde(rename = "faceRectangle")]
    pub rectangle: FaceRectangle,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    faces: Vec<Face>,
    #[serde(rename = "requestId")]
    request_id: Option<String>,
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

/// Client for the image analysis endpoint.
pub struct VisionClient {
    client: reqwest::Client,
    config: VisionConfig,
}

impl VisionClient {
    pub fn new(config: VisionConfig) -> ConnectorResult<Self> {
        if config.key.is_empty() || config.endpoint.is_empty() {
            return Err(ConnectorError::Config(
                "Azure Vision needs both a key and an endpoint".into(),
            ));
        }
        let client = build_client(config.timeout_secs)?;
        let config = VisionConfig {
            endpoint: trim_base(&config.endpoint),
            ..config
        };
        Ok(Self { client, config })
    }

    fn url(&self) -> String {
        format!("{}/{ANALYZE_PATH}", self.config.endpoint)
    }

    fn request(&self) -> reqwest::RequestBuilder {
        self.client
            .post(self.url())
            .query(&[("visualFeatures", "Faces")])
            .header(SUBSCRIPTION_KEY_HEADER, &self.config.key)
    }

    /// Detect faces in a publicly reachable image.
    pub async fn analyze_faces_url(&self, image_url: &str) -> ConnectorResult<Vec<Face>> {
        info!(image_url, "analyzing faces");
        let resp = self
            .request()
            .json(&ImageUrl { url: image_url })
            .send()
            .await?;
        Self::faces(resp).await
    }

    /// Detect faces in raw image bytes (JPEG, PNG, GIF or BMP).
    pub async fn analyze_faces_bytes(&self, image: Vec<u8>) -> ConnectorResult<Vec<Face>> {
        info!(bytes = image.len(), "analyzing faces");
        let resp = self
            .request()
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image)
            .send()
            .await?;
        Self::faces(resp).await
    }

    async fn faces(resp: reqwest::Response) -> ConnectorResult<Vec<Face>> {
        let resp = check_status(resp).await?;
        let parsed: AnalyzeResponse = resp.json().await?;
        info!(
            faces = parsed.faces.len(),
            request_id = ?parsed.request_id,
            "face analysis complete"
        );
        Ok(parsed.faces)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"{
        "faces": [
            {
                "age": 44,
                "gender": "Male",
                "faceRectangle": { "left": 593, "top": 160, "width": 250, "height": 250 }
            },
            {
                "age": 34,
                "gender": "Female",
                "faceRectangle": { "left": 111, "top": 92, "width": 196, "height": 196 }
            }
        ],
        "requestId": "1a7a0ba3-8e4a-4e6d-9b2b-6d4f5c3b2a10",
        "metadata": { "height": 768, "width": 1024, "format": "Jpeg" },
        "modelVersion": "2021-05-01"
    }"#;

    #[test]
    fn parses_faces() {
        let parsed: AnalyzeResponse = serde_json::from_str(RESPONSE).unwrap();
        assert_eq!(parsed.faces.len(), 2);
        assert_eq!(parsed.faces[0].age, 44);
        assert_eq!(parsed.faces[1].gender, "Female");
        assert_eq!(
            parsed.faces[1].rectangle,
            FaceRectangle {
                left: 111,
                top: 92,
                width: 196,
                height: 196
            }
        );
    }

    #[test]
    fn no_faces_field_is_empty() {
        let parsed: AnalyzeResponse = serde_json::from_str(r#"{"requestId":"x"}"#).unwrap();
        assert!(parsed.faces.is_empty());
    }

    #[test]
    fn url_from_endpoint() {
        let c = VisionClient::new(VisionConfig::new(
            "key",
            "https://my-vision.cognitiveservices.azure.com/",
        ))
        .unwrap();
        assert_eq!(
            c.url(),
            "https://my-vision.cognitiveservices.azure.com/vision/v3.2/analyze"
        );
    }

    #[test]
    fn requires_endpoint() {
        assert!(matches!(
            VisionClient::new(VisionConfig::new("key", "")),
            Err(ConnectorError::Config(_))
        ));
    }

    #[test]
    fn face_json_uses_wire_names() {
        let face = Face {
            age: 30,
            gender: "Female".into(),
            rectangle: FaceRectangle {
                left: 1,
                top: 2,
                width: 3,
                height: 4,
            },
        };
        let json = serde_json::to_value(&face).unwrap();
        assert_eq!(json["faceRectangle"]["width"], 3);
    }
}
