use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::jwks::{self, HttpKeyFetcher, KeyFetcher};
use crate::jws::{self, DecodedJws, Signature};
use crate::numeric;
use crate::verify::verify_signature;

/// Decodes a scanned SMART Health Card, with or without the `shc:/` prefix.
///
/// Nothing is verified here; the returned claims are untrusted until
/// [`verify`] accepts them.
pub fn decode(data: &str) -> Result<DecodedJws> {
    let digits = numeric::strip_prefix(data);
    let compact = numeric::to_compact(digits)?;
    let card = jws::split(&compact)?;
    debug!(kid = %card.kid(), issuer = ?card.issuer(), "decoded health card");
    Ok(card)
}

/// Checks the card's signature against the issuer's published key.
///
/// `Ok(false)` means the card was well formed but its signature does not
/// match; errors mean verification could not be attempted.
pub fn verify<F>(card: &DecodedJws, fetcher: &F) -> Result<bool>
where
    F: KeyFetcher + ?Sized,
{
    let signature = Signature::decode(&card.signature)?;
    let key = jwks::resolve_key(fetcher, &card.header, &card.payload)?;
    let valid = verify_signature(&card.signed_document, &signature, &key);
    info!(kid = %card.kid(), valid, "verified health card signature");
    Ok(valid)
}

/// Verifies cards against keys obtained from one fetcher.
#[derive(Debug, Clone)]
pub struct Verifier<F = HttpKeyFetcher> {
    fetcher: F,
}

impl Verifier<HttpKeyFetcher> {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Verifier {
            fetcher: HttpKeyFetcher::new(config)?,
        })
    }
}

impl<F: KeyFetcher> Verifier<F> {
    pub fn with_fetcher(fetcher: F) -> Self {
        Verifier { fetcher }
    }

    pub fn verify(&self, card: &DecodedJws) -> Result<bool> {
        verify(card, &self.fetcher)
    }

    pub fn decode_and_verify(&self, data: &str) -> Result<(DecodedJws, bool)> {
        let card = decode(data)?;
        let valid = self.verify(&card)?;
        Ok((card, valid))
    }
}

#[test]
fn decode_test() {
    let data = include_str!("../tests/fixtures/card.txt");
    let card = decode(data).unwrap();

    assert_eq!(card.kid(), "d5s3EggvcXZklbITnU6_NzLOMo8IgMzKzL-jMJJOgXM");
    assert_eq!(card.header.alg.as_deref(), Some("ES256"));
    assert_eq!(card.header.zip.as_deref(), Some("DEF"));
    assert_eq!(
        card.issuer(),
        Some("https://spec.smarthealth.cards/examples/issuer")
    );

    let subject = &card.payload["vc"]["credentialSubject"];
    assert_eq!(subject["fhirVersion"], "4.0.1");
    let patient = &subject["fhirBundle"]["entry"][0]["resource"];
    assert_eq!(patient["name"][0]["family"], "Anyperson");
    assert_eq!(patient["birthDate"], "1951-01-20");

    assert!(card.signed_document.starts_with("eyJ"));
    assert_eq!(card.signed_document.matches('.').count(), 1);
    assert_eq!(Signature::decode(&card.signature).unwrap().r.len(), 32);

    // the prefix is optional
    let digits = data.trim_end().strip_prefix("shc:/").unwrap();
    assert_eq!(decode(digits).unwrap(), card);
}

#[test]
fn decode_rejects_garbage() {
    use crate::error::Error;

    match decode("shc:/567629095") {
        Err(Error::InputFormat { invalid_chars, len }) => {
            assert!(invalid_chars.is_empty());
            assert_eq!(len, 9);
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(
        decode("shc:/56Z6"),
        Err(Error::InputFormat { .. })
    ));
    // "43" decodes to a single 'X': no segment separators at all
    assert!(matches!(
        decode("shc:/43"),
        Err(Error::SegmentCount { found: 1 })
    ));
}
