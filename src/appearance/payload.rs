use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;

use crate::appearance::raster::{decode_legacy, RasterError, RawSkin};

/// Appearance-relevant client metadata sent with the login payload. The wire
/// format is a loosely-typed JSON object; unknown fields are ignored and the
/// raw object is kept alongside the typed fields for image extraction.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ClientPayload {
    #[serde(skip)]
    json: Option<Map<String, Value>>,

    #[serde(rename = "SkinId")]
    pub skin_id: String,
    #[serde(rename = "CapeId")]
    pub cape_id: String,
    #[serde(rename = "SkinResourcePatch")]
    pub geometry_name: String,
    #[serde(rename = "SkinGeometryData")]
    pub geometry_data: String,
    #[serde(rename = "PersonaSkin")]
    pub persona_skin: bool,
    #[serde(rename = "PremiumSkin")]
    pub premium_skin: bool,
    #[serde(rename = "CapeOnClassicSkin")]
    pub cape_on_classic_skin: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    Malformed(String),
    InvalidBase64 { field: String },
    Raster(RasterError),
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::Malformed(message) => write!(f, "malformed payload: {}", message),
            PayloadError::InvalidBase64 { field } => {
                write!(f, "field {} is not valid base64", field)
            }
            PayloadError::Raster(err) => write!(f, "{}", err),
        }
    }
}

impl From<RasterError> for PayloadError {
    fn from(err: RasterError) -> Self {
        PayloadError::Raster(err)
    }
}

impl ClientPayload {
    pub fn parse(raw: &str) -> Result<Self, PayloadError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|err| PayloadError::Malformed(err.to_string()))?;
        let map = match value {
            Value::Object(map) => map,
            _ => return Err(PayloadError::Malformed("payload is not an object".to_string())),
        };
        let mut payload: ClientPayload = serde_json::from_value(Value::Object(map.clone()))
            .map_err(|err| PayloadError::Malformed(err.to_string()))?;
        payload.json = Some(map);
        Ok(payload)
    }

    /// Installs the raw payload map once. A payload that already carries
    /// data refuses the overwrite; later login packets cannot swap the map
    /// out from under a live session.
    pub fn set_json_data(&mut self, data: Option<Map<String, Value>>) {
        if self.json.is_none() {
            self.json = data;
        }
    }

    pub fn json_data(&self) -> Option<&Map<String, Value>> {
        self.json.as_ref()
    }

    /// Extracts the named image (`"Skin"`, `"Cape"`) from the raw payload.
    /// A missing `<name>Data` field is not an error; players without a cape
    /// simply omit it. Explicit `<name>ImageWidth`/`<name>ImageHeight`
    /// fields are trusted; without them the byte count decides the shape.
    pub fn extract_image(&self, name: &str) -> Result<Option<RawSkin>, PayloadError> {
        let json = match &self.json {
            Some(json) => json,
            None => return Ok(None),
        };
        let blob = match json.get(&format!("{name}Data")).and_then(Value::as_str) {
            Some(blob) => blob,
            None => return Ok(None),
        };
        let pixels = BASE64_ENGINE.decode(blob).map_err(|_| PayloadError::InvalidBase64 {
            field: format!("{name}Data"),
        })?;

        let width = json.get(&format!("{name}ImageWidth")).and_then(Value::as_u64);
        let height = json.get(&format!("{name}ImageHeight")).and_then(Value::as_u64);
        if let (Some(width), Some(height)) = (width, height) {
            let width = u32::try_from(width)
                .map_err(|_| PayloadError::Malformed(format!("{name}ImageWidth out of range")))?;
            let height = u32::try_from(height)
                .map_err(|_| PayloadError::Malformed(format!("{name}ImageHeight out of range")))?;
            return Ok(Some(RawSkin {
                width,
                height,
                pixels,
            }));
        }
        Ok(Some(decode_legacy(pixels)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_json(fields: &[(&str, Value)]) -> String {
        let mut map = Map::new();
        for (key, value) in fields {
            map.insert((*key).to_string(), value.clone());
        }
        Value::Object(map).to_string()
    }

    #[test]
    fn explicit_dimensions_bypass_legacy_table() {
        // 16 bytes would never satisfy the legacy table; the declared
        // dimensions must win.
        let pixels: Vec<u8> = (0u8..16).collect();
        let raw = payload_json(&[
            ("SkinData", Value::String(BASE64_ENGINE.encode(&pixels))),
            ("SkinImageWidth", Value::from(64u64)),
            ("SkinImageHeight", Value::from(32u64)),
        ]);
        let payload = ClientPayload::parse(&raw).expect("payload");
        let skin = payload.extract_image("Skin").expect("extract").expect("skin");
        assert_eq!(skin.width, 64);
        assert_eq!(skin.height, 32);
        assert_eq!(skin.pixels, pixels);
    }

    #[test]
    fn legacy_fallback_uses_byte_count() {
        let pixels = vec![0xab; 16_384];
        let raw = payload_json(&[("SkinData", Value::String(BASE64_ENGINE.encode(&pixels)))]);
        let payload = ClientPayload::parse(&raw).expect("payload");
        let skin = payload.extract_image("Skin").expect("extract").expect("skin");
        assert_eq!(skin.width, 64);
        assert_eq!(skin.height, 64);
        assert_eq!(skin.pixels, pixels);
    }

    #[test]
    fn missing_field_is_absent_not_error() {
        let raw = payload_json(&[("SkinData", Value::String(BASE64_ENGINE.encode([0u8; 8_192])))]);
        let payload = ClientPayload::parse(&raw).expect("payload");
        assert_eq!(payload.extract_image("Cape"), Ok(None));
    }

    #[test]
    fn unknown_legacy_size_propagates() {
        let raw = payload_json(&[("SkinData", Value::String(BASE64_ENGINE.encode([0u8; 100])))]);
        let payload = ClientPayload::parse(&raw).expect("payload");
        match payload.extract_image("Skin") {
            Err(PayloadError::Raster(RasterError::UnknownLegacyFormat { length })) => {
                assert_eq!(length, 100)
            }
            other => panic!("expected raster error, got {:?}", other),
        }
    }

    #[test]
    fn oversized_explicit_dimensions_are_rejected() {
        let raw = payload_json(&[
            ("SkinData", Value::String(BASE64_ENGINE.encode([0u8; 16]))),
            ("SkinImageWidth", Value::from(u64::MAX)),
            ("SkinImageHeight", Value::from(32u64)),
        ]);
        let payload = ClientPayload::parse(&raw).expect("payload");
        match payload.extract_image("Skin") {
            Err(PayloadError::Malformed(message)) => {
                assert_eq!(message, "SkinImageWidth out of range")
            }
            other => panic!("expected dimension error, got {:?}", other),
        }
    }

    #[test]
    fn invalid_base64_is_reported() {
        let raw = payload_json(&[("CapeData", Value::String("!!not base64!!".to_string()))]);
        let payload = ClientPayload::parse(&raw).expect("payload");
        match payload.extract_image("Cape") {
            Err(PayloadError::InvalidBase64 { field }) => assert_eq!(field, "CapeData"),
            other => panic!("expected base64 error, got {:?}", other),
        }
    }

    #[test]
    fn typed_fields_and_unknown_keys() {
        let raw = payload_json(&[
            ("SkinId", Value::String("c18e65aa-7b21".to_string())),
            ("PersonaSkin", Value::Bool(true)),
            ("DeviceModel", Value::String("not an appearance field".to_string())),
        ]);
        let payload = ClientPayload::parse(&raw).expect("payload");
        assert_eq!(payload.skin_id, "c18e65aa-7b21");
        assert!(payload.persona_skin);
        assert!(!payload.premium_skin);
    }

    #[test]
    fn json_data_is_set_once() {
        let raw = payload_json(&[("SkinId", Value::String("first".to_string()))]);
        let mut payload = ClientPayload::parse(&raw).expect("payload");

        let mut replacement = Map::new();
        replacement.insert("SkinId".to_string(), Value::String("second".to_string()));
        payload.set_json_data(Some(replacement.clone()));
        assert_eq!(
            payload.json_data().and_then(|json| json.get("SkinId")),
            Some(&Value::String("first".to_string()))
        );

        let mut empty = ClientPayload::default();
        assert!(empty.json_data().is_none());
        empty.set_json_data(Some(replacement));
        assert_eq!(
            empty.json_data().and_then(|json| json.get("SkinId")),
            Some(&Value::String("second".to_string()))
        );
    }
}
