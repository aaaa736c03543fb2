use base64::engine::general_purpose::STANDARD as BASE64_ENGINE;
use base64::Engine as _;
use serde_json::Value;
use std::fmt;

use crate::config::{ProxyConfig, TrustMode};
use crate::telemetry::logging;

/// A signed property on a game profile. The signature is verified upstream;
/// this pipeline treats the value as an opaque blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileProperty {
    pub name: String,
    pub value: String,
    pub signature: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameProfile {
    pub id: String,
    pub name: String,
    pub properties: Vec<ProfileProperty>,
}

impl GameProfile {
    pub fn property(&self, name: &str) -> Option<&ProfileProperty> {
        self.properties.iter().find(|property| property.name == name)
    }
}

/// Appearance identity extracted from the signed `textures` property.
/// `skin_url` empty means "use the default appearance".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetIdentity {
    pub skin_url: String,
    pub cape_url: Option<String>,
    pub slim_model: bool,
}

impl Default for AssetIdentity {
    fn default() -> Self {
        Self {
            skin_url: String::new(),
            cape_url: None,
            slim_model: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityError {
    MissingTexturesProperty,
    InvalidBase64,
    MalformedJson,
    MissingTextures,
    MissingSkinUrl,
    MissingCapeUrl,
}

impl fmt::Display for IdentityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            IdentityError::MissingTexturesProperty => "no textures property on profile",
            IdentityError::InvalidBase64 => "textures property is not valid base64",
            IdentityError::MalformedJson => "textures property is not valid JSON",
            IdentityError::MissingTextures => "no textures object in property",
            IdentityError::MissingSkinUrl => "no skin URL in textures",
            IdentityError::MissingCapeUrl => "cape entry without URL",
        };
        f.write_str(message)
    }
}

/// Walks the signed texture property. Every lookup step short-circuits on
/// the first absent value; callers decide what a failure means.
pub fn try_extract_identity(profile: &GameProfile) -> Result<AssetIdentity, IdentityError> {
    let property = profile
        .property("textures")
        .ok_or(IdentityError::MissingTexturesProperty)?;
    let decoded = BASE64_ENGINE
        .decode(property.value.as_bytes())
        .map_err(|_| IdentityError::InvalidBase64)?;
    let root: Value =
        serde_json::from_slice(&decoded).map_err(|_| IdentityError::MalformedJson)?;

    let textures = root
        .get("textures")
        .and_then(Value::as_object)
        .ok_or(IdentityError::MissingTextures)?;
    let skin = textures
        .get("SKIN")
        .and_then(Value::as_object)
        .ok_or(IdentityError::MissingSkinUrl)?;
    let skin_url = skin
        .get("url")
        .and_then(Value::as_str)
        .ok_or(IdentityError::MissingSkinUrl)?
        .to_string();
    // The metadata key is only present for the slim body variant.
    let slim_model = skin.contains_key("metadata");

    let cape_url = match textures.get("CAPE") {
        Some(cape) => Some(
            cape.get("url")
                .and_then(Value::as_str)
                .ok_or(IdentityError::MissingCapeUrl)?
                .to_string(),
        ),
        None => None,
    };

    Ok(AssetIdentity {
        skin_url,
        cape_url,
        slim_model,
    })
}

/// Never fails outward: a malformed identity is cosmetic, not a reason to
/// abort a login. Failures collapse to the default identity and, outside
/// offline trust mode, leave a debug trace.
pub fn extract_identity(profile: &GameProfile, config: &ProxyConfig) -> AssetIdentity {
    match try_extract_identity(profile) {
        Ok(identity) => identity,
        Err(err) => {
            if config.trust_mode != TrustMode::Offline {
                logging::log_debug(&format!(
                    "invalid texture data for {}: {}",
                    profile.name, err
                ));
            }
            AssetIdentity::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_with_textures(textures_json: &str) -> GameProfile {
        GameProfile {
            id: "d3c47f6f-ae3a-45c1-ad7c-e2c762b03ae6".to_string(),
            name: "TestPlayer".to_string(),
            properties: vec![ProfileProperty {
                name: "textures".to_string(),
                value: BASE64_ENGINE.encode(textures_json),
                signature: Some("sig".to_string()),
            }],
        }
    }

    #[test]
    fn slim_model_from_metadata_presence() {
        let profile = profile_with_textures(
            r#"{"textures":{"SKIN":{"url":"http://textures.example/skin/a1","metadata":{"model":"slim"}}}}"#,
        );
        let identity = try_extract_identity(&profile).expect("identity");
        assert_eq!(identity.skin_url, "http://textures.example/skin/a1");
        assert!(identity.slim_model);
        assert_eq!(identity.cape_url, None);
    }

    #[test]
    fn classic_model_without_metadata() {
        let profile = profile_with_textures(
            r#"{"textures":{"SKIN":{"url":"http://textures.example/skin/a1"}}}"#,
        );
        let identity = try_extract_identity(&profile).expect("identity");
        assert!(!identity.slim_model);
    }

    #[test]
    fn cape_url_read_when_present() {
        let profile = profile_with_textures(
            r#"{"textures":{"SKIN":{"url":"http://textures.example/skin/a1"},"CAPE":{"url":"http://textures.example/cape/b2"}}}"#,
        );
        let identity = try_extract_identity(&profile).expect("identity");
        assert_eq!(
            identity.cape_url.as_deref(),
            Some("http://textures.example/cape/b2")
        );
    }

    #[test]
    fn cape_entry_without_url_is_an_error() {
        let profile = profile_with_textures(
            r#"{"textures":{"SKIN":{"url":"http://textures.example/skin/a1"},"CAPE":{}}}"#,
        );
        assert_eq!(
            try_extract_identity(&profile),
            Err(IdentityError::MissingCapeUrl)
        );
    }

    #[test]
    fn malformed_property_absorbs_to_default() {
        let config = ProxyConfig::default();
        let cases = [
            GameProfile {
                id: "id".to_string(),
                name: "NoProps".to_string(),
                properties: Vec::new(),
            },
            GameProfile {
                id: "id".to_string(),
                name: "BadBase64".to_string(),
                properties: vec![ProfileProperty {
                    name: "textures".to_string(),
                    value: "%%%".to_string(),
                    signature: None,
                }],
            },
            profile_with_textures("not json at all"),
            profile_with_textures(r#"{"textures":{}}"#),
            profile_with_textures(r#"{"textures":{"SKIN":{}}}"#),
        ];
        for profile in cases {
            let identity = extract_identity(&profile, &config);
            assert_eq!(identity, AssetIdentity::default(), "profile {}", profile.name);
            assert_eq!(identity.skin_url, "");
            assert_eq!(identity.cape_url, None);
            assert!(!identity.slim_model);
        }
    }
}
