//! Message encryption (RFC 8188, RFC 8291) and VAPID signing (RFC 8292)

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use p256::pkcs8::{EncodePrivateKey, LineEnding};
use serde::Serialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::prelude::*;

/// Lifetime of a VAPID token. Push services reject tokens valid for more than 24 hours.
pub const VAPID_TOKEN_LIFETIME: Duration = Duration::from_secs(12 * 3600);

/// Encrypts `payload` for the subscription identified by its `p256dh` and `auth` keys
///
/// The result is a complete `aes128gcm` body: salt, record size and sender key header
/// followed by the ciphertext.
pub fn encrypt_payload(payload: &str, p256dh: &str, auth: &str) -> Result<Vec<u8>, String> {
	let p256dh = URL_SAFE_NO_PAD.decode(p256dh).map_err(|e| format!("Invalid p256dh: {}", e))?;
	let auth = URL_SAFE_NO_PAD.decode(auth).map_err(|e| format!("Invalid auth: {}", e))?;

	let encrypted = ece::encrypt(&p256dh, &auth, payload.as_bytes())
		.map_err(|e| format!("ECE encryption failed: {:?}", e))?;
	Ok(encrypted)
}

#[derive(Serialize)]
struct VapidClaims<'a> {
	aud: String,
	exp: u64,
	sub: &'a str,
}

/// Signing identity set through `set_vapid_details`
#[derive(Clone)]
pub struct VapidSigner {
	subject: Box<str>,
	public_key: Box<str>,
	key: EncodingKey,
}

impl std::fmt::Debug for VapidSigner {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("VapidSigner")
			.field("subject", &self.subject)
			.field("public_key", &self.public_key)
			.finish_non_exhaustive()
	}
}

impl VapidSigner {
	/// Builds a signer from base64url keys
	///
	/// `private_key` is the raw 32-byte P-256 scalar, `public_key` the uncompressed point.
	pub fn new(subject: &str, public_key: &str, private_key: &str) -> ClResult<Self> {
		let subject = subject.trim();
		if !(subject.starts_with("mailto:")
			|| subject.starts_with("https://")
			|| subject.starts_with("http://"))
		{
			return Err(Error::ConfigError(format!("invalid VAPID subject: {}", subject)));
		}

		let public_bytes = URL_SAFE_NO_PAD
			.decode(public_key)
			.map_err(|e| Error::ConfigError(format!("invalid VAPID public key: {}", e)))?;
		p256::PublicKey::from_sec1_bytes(&public_bytes)
			.map_err(|e| Error::ConfigError(format!("invalid VAPID public key: {}", e)))?;

		let private_bytes = URL_SAFE_NO_PAD
			.decode(private_key)
			.map_err(|e| Error::ConfigError(format!("invalid VAPID private key: {}", e)))?;
		if private_bytes.len() != 32 {
			return Err(Error::ConfigError(format!(
				"invalid VAPID private key length: {}",
				private_bytes.len()
			)));
		}
		let secret_key = p256::SecretKey::from_bytes(private_bytes.as_slice().into())
			.map_err(|e| Error::ConfigError(format!("invalid VAPID private key: {:?}", e)))?;
		let pem = secret_key
			.to_pkcs8_pem(LineEnding::LF)
			.map_err(|e| Error::ConfigError(format!("failed to encode VAPID key: {:?}", e)))?;
		let key = EncodingKey::from_ec_pem(pem.as_bytes())
			.map_err(|e| Error::ConfigError(format!("invalid VAPID private key: {}", e)))?;

		Ok(Self { subject: subject.into(), public_key: public_key.into(), key })
	}

	pub fn subject(&self) -> &str {
		&self.subject
	}

	pub fn public_key(&self) -> &str {
		&self.public_key
	}

	/// Signs a token for the origin of `endpoint`
	pub fn token(&self, endpoint: &str) -> Result<String, String> {
		let url = url::Url::parse(endpoint).map_err(|e| format!("Invalid endpoint URL: {}", e))?;
		let audience = url.origin().ascii_serialization();
		if audience == "null" {
			return Err(format!("Endpoint has no origin: {}", endpoint));
		}

		let exp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO)
			+ VAPID_TOKEN_LIFETIME;
		let claims = VapidClaims { aud: audience, exp: exp.as_secs(), sub: &self.subject };

		jsonwebtoken::encode(&Header::new(Algorithm::ES256), &claims, &self.key)
			.map_err(|e| format!("JWT encoding failed: {}", e))
	}

	/// `Authorization` header value for `endpoint`
	pub fn authorization(&self, endpoint: &str) -> Result<String, String> {
		Ok(format!("vapid t={},k={}", self.token(endpoint)?, self.public_key))
	}
}


// vim: ts=4
