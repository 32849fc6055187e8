//! Decoding and verification of SMART Health Cards.
//!
//! A card reaches us as the numeric payload of a QR code (`shc:/5676...`).
//! [`decode`] turns it back into the compact JWS it encodes and exposes the
//! header and the inflated payload; [`verify`] fetches the issuer's key set
//! and checks the ES256 signature.
//!
//! ```no_run
//! use shcdec::{Config, Verifier};
//!
//! # fn main() -> shcdec::Result<()> {
//! let card = shcdec::decode("shc:/5676290952432060346029243740446031222959532654603460292540772804336028702864716745222809286436045477")?;
//! println!("signed with key {}", card.kid());
//!
//! let verifier = Verifier::new(&Config::from_env())?;
//! if verifier.verify(&card)? {
//!     println!("{}", card.payload);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod jwks;
pub mod jws;
pub mod numeric;
pub mod shc;
pub mod verify;

pub use config::Config;
pub use error::{DecodeFailure, Error, Result, Segment};
pub use jwks::{HttpKeyFetcher, KeyFetcher, KeyRecord, KeySet};
pub use jws::{DecodedJws, Header, Signature};
pub use shc::{decode, verify, Verifier};
pub use verify::PublicPoint;
