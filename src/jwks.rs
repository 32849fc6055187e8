//! Issuer key discovery.
//!
//! Issuers publish their signing keys as a JWK set under
//! `{iss}/.well-known/jwks.json`. A card names its key with the `kid` header.

use base64::Engine;
use serde_derive::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::jws::{Header, BASE64URL};
use crate::verify::PublicPoint;

const WELL_KNOWN_JWKS: &str = "/.well-known/jwks.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawKeySet")]
pub struct KeySet {
    pub keys: Vec<KeyRecord>,
}

#[derive(Deserialize)]
struct RawKeySet {
    keys: Vec<Value>,
}

impl From<RawKeySet> for KeySet {
    fn from(raw: RawKeySet) -> Self {
        KeySet {
            keys: raw.keys.iter().map(KeyRecord::from).collect(),
        }
    }
}

/// One JWK of the issuer's key set. Only the members used for selection and
/// verification are kept; members that are not strings read as absent.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRecord {
    pub kty: Option<String>,
    pub use_: Option<String>,
    pub alg: Option<String>,
    pub crv: Option<String>,
    pub kid: Option<String>,
    pub x: Option<String>,
    pub y: Option<String>,
    /// The record has a `d` member, whatever its value. Such a record is
    /// never used.
    pub private: bool,
}

impl From<&Value> for KeyRecord {
    fn from(jwk: &Value) -> Self {
        let member = |name: &str| jwk.get(name).and_then(Value::as_str).map(str::to_string);
        KeyRecord {
            kty: member("kty"),
            use_: member("use"),
            alg: member("alg"),
            crv: member("crv"),
            kid: member("kid"),
            x: member("x"),
            y: member("y"),
            private: jwk.as_object().map_or(false, |jwk| jwk.contains_key("d")),
        }
    }
}

impl KeyRecord {
    /// An ES256 public signing key on P-256.
    pub fn is_verification_key(&self) -> bool {
        self.kty.as_deref() == Some("EC")
            && self.use_.as_deref() == Some("sig")
            && self.alg.as_deref() == Some("ES256")
            && self.crv.as_deref() == Some("P-256")
            && !self.private
    }

    pub fn point(&self) -> Result<PublicPoint> {
        let kid = self.kid.clone().unwrap_or_default();
        let coordinate = |name: &str, value: &Option<String>| -> Result<Vec<u8>> {
            let value = value.as_deref().ok_or_else(|| Error::KeyFormat {
                kid: kid.clone(),
                message: format!("missing `{}` coordinate", name),
            })?;
            BASE64URL.decode(value).map_err(|e| Error::KeyFormat {
                kid: kid.clone(),
                message: format!("`{}` coordinate: {}", name, e),
            })
        };

        Ok(PublicPoint {
            x: coordinate("x", &self.x)?,
            y: coordinate("y", &self.y)?,
        })
    }
}

/// Source of issuer key sets. Caching, if any, belongs to implementors.
pub trait KeyFetcher {
    fn fetch(&self, url: &str) -> Result<KeySet>;
}

/// Fetches key sets over HTTP(S) with a blocking client.
#[derive(Debug, Clone)]
pub struct HttpKeyFetcher {
    client: reqwest::blocking::Client,
}

impl HttpKeyFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(Error::Client)?;
        Ok(HttpKeyFetcher { client })
    }
}

impl KeyFetcher for HttpKeyFetcher {
    fn fetch(&self, url: &str) -> Result<KeySet> {
        debug!(url = %url, "fetching issuer key set");
        let fail = |message: String| Error::KeyFetch {
            url: url.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| fail(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fail(format!("HTTP status {}", status)));
        }
        let body = response.bytes().map_err(|e| fail(e.to_string()))?;

        let key_set = parse_key_set(&body).map_err(|e| fail(e.to_string()))?;
        debug!(url = %url, keys = key_set.keys.len(), "fetched issuer key set");
        Ok(key_set)
    }
}

pub fn parse_key_set(body: &[u8]) -> serde_json::Result<KeySet> {
    serde_json::from_slice(body)
}

/// `{iss}/.well-known/jwks.json` for the payload's issuer.
pub fn key_set_url(payload: &Value) -> Result<String> {
    let issuer = payload
        .get("iss")
        .and_then(Value::as_str)
        .ok_or(Error::MissingIssuer)?;
    Ok(format!("{}{}", issuer, WELL_KNOWN_JWKS))
}

/// First record with the requested `kid` that is an ES256 public key.
pub fn select_key<'a>(key_set: &'a KeySet, kid: &str) -> Result<&'a KeyRecord> {
    key_set
        .keys
        .iter()
        .filter(|key| key.kid.as_deref() == Some(kid))
        .find(|key| {
            let usable = key.is_verification_key();
            if !usable {
                warn!(
                    kid = %kid,
                    kty = ?key.kty,
                    alg = ?key.alg,
                    crv = ?key.crv,
                    "skipping key that is not an ES256 public signing key"
                );
            }
            usable
        })
        .ok_or_else(|| Error::KeyNotFound {
            kid: kid.to_string(),
        })
}

/// Looks up the key that signed a card: derive the key set URL from the
/// payload, fetch it and pick the record named by the header.
pub fn resolve_key<F>(fetcher: &F, header: &Header, payload: &Value) -> Result<PublicPoint>
where
    F: KeyFetcher + ?Sized,
{
    let url = key_set_url(payload)?;
    let key_set = fetcher.fetch(&url)?;
    let key = select_key(&key_set, &header.kid)?;
    debug!(kid = %header.kid, "selected verification key");
    key.point()
}
