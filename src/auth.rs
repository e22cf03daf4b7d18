//! Authentication for the peripheral API.
//!
//! The provider is configured with a shared secret. At configure time it is
//! used to sign a short-lived HS256 JWT, which is then attached to every
//! request as a bearer token by [`BearerToken`].

use chrono::{DateTime, Duration, Utc};
use http::header::AUTHORIZATION;
use http::HeaderValue;
use jsonwebtoken::{encode, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::client::{ApiRequest, ClientError, RequestEditor};
use crate::error::ProviderError;

/// Issuer claim expected by the peripheral API.
pub const TOKEN_ISSUER: &str = "peripheral";

/// How long a minted token stays valid, in seconds.
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

/// Claims carried by the API token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Issuer.
    pub iss: String,
    /// Expiry as a Unix timestamp.
    pub exp: i64,
}

/// Sign an API token with the shared secret.
///
/// # Errors
/// Returns [`ProviderError::Configuration`] if the token cannot be encoded.
pub fn mint_token(secret: &SecretString, now: DateTime<Utc>) -> Result<SecretString, ProviderError> {
    let claims = Claims {
        iss: TOKEN_ISSUER.to_string(),
        exp: (now + Duration::seconds(TOKEN_LIFETIME_SECS)).timestamp(),
    };
    let key = EncodingKey::from_secret(secret.expose_secret().as_bytes());
    let token = encode(&Header::default(), &claims, &key).map_err(|e| {
        ProviderError::Configuration(format!("Token Encoding Error: failed to encode JWT token: {}", e))
    })?;
    Ok(SecretString::from(token))
}

/// Request editor that sets `Authorization: Bearer <token>`.
pub struct BearerToken {
    value: HeaderValue,
}

impl BearerToken {
    /// Prepare the header for a token.
    ///
    /// # Errors
    /// Returns [`ProviderError::Configuration`] if the token is not a valid header value.
    pub fn new(token: &SecretString) -> Result<Self, ProviderError> {
        let mut value = HeaderValue::try_from(format!("Bearer {}", token.expose_secret()))
            .map_err(|e| {
                ProviderError::Configuration(format!("Auth Setup Error: invalid bearer token: {}", e))
            })?;
        value.set_sensitive(true);
        Ok(Self { value })
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(..)")
    }
}

impl RequestEditor for BearerToken {
    fn edit(&self, request: &mut ApiRequest) -> Result<(), ClientError> {
        request.headers.insert(AUTHORIZATION, self.value.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use http::Method;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
    use url::Url;

    fn secret() -> SecretString {
        SecretString::from("shared-secret".to_string())
    }

    #[test]
    fn test_minted_token_verifies_with_shared_secret() {
        let token = mint_token(&secret(), Utc::now()).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        let data = decode::<Claims>(
            token.expose_secret(),
            &DecodingKey::from_secret(b"shared-secret"),
            &validation,
        )
        .unwrap();
        assert_eq!(data.claims.iss, "peripheral");
    }

    #[test]
    fn test_token_expires_after_one_hour() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let token = mint_token(&secret(), now).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        let data = decode::<Claims>(
            token.expose_secret(),
            &DecodingKey::from_secret(b"shared-secret"),
            &validation,
        )
        .unwrap();
        assert_eq!(data.claims.exp, now.timestamp() + 3600);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = mint_token(&secret(), Utc::now()).unwrap();
        let result = decode::<Claims>(
            token.expose_secret(),
            &DecodingKey::from_secret(b"other-secret"),
            &Validation::new(Algorithm::HS256),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_bearer_editor_sets_authorization() {
        let editor = BearerToken::new(&SecretString::from("abc.def.ghi".to_string())).unwrap();
        let mut request = ApiRequest::new(Method::GET, Url::parse("https://example.com/").unwrap());
        editor.edit(&mut request).unwrap();

        let header = request.headers.get(AUTHORIZATION).unwrap();
        assert_eq!(header, "Bearer abc.def.ghi");
        assert!(header.is_sensitive());
        assert_eq!(format!("{:?}", editor), "BearerToken(..)");
    }

    #[test]
    fn test_bearer_rejects_header_breaking_tokens() {
        let result = BearerToken::new(&SecretString::from("abc\r\ndef".to_string()));
        assert!(matches!(result, Err(ProviderError::Configuration(_))));
    }
}
