use serde::{Deserialize, Serialize};

/// Credential pair issued at login and on renewal.
///
/// The renewal endpoint always returns a fresh access token; whether it
/// also rotates the refresh token depends on the deployment, so that field
/// stays optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access_token: access.into(),
            refresh_token: Some(refresh.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renewal_without_rotation_omits_refresh() {
        let pair = TokenPair {
            access_token: "acc-2".to_string(),
            refresh_token: None,
        };

        let json = serde_json::to_string(&pair).unwrap();
        assert_eq!(json, r#"{"accessToken":"acc-2"}"#);

        let back: TokenPair = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pair);
    }
}
