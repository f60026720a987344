use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::TryRngCore;
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// RFC 6238 defaults: 6 digits, 30-second time step, SHA-1.
pub const DIGITS: usize = 6;
pub const PERIOD: u64 = 30;

/// Secret length in bytes (160 bits, the RFC 4226 recommended minimum).
pub const SECRET_LEN: usize = 20;

/// Accepted clock drift in time steps on either side of "now".
pub const DEFAULT_WINDOW: u64 = 1;

const BASE32: base32::Alphabet = base32::Alphabet::Rfc4648 { padding: false };

#[derive(Debug, thiserror::Error)]
pub enum TotpError {
    #[error("entropy source unavailable: {0}")]
    Entropy(String),

    #[error("code must be exactly {DIGITS} digits")]
    MalformedCode,

    #[error("stored secret is not valid base32")]
    InvalidSecret,
}

/// Generate a fresh secret from the OS CSPRNG, base32-encoded for manual
/// entry and QR encoding.
pub fn generate_secret() -> Result<String, TotpError> {
    let mut bytes = [0u8; SECRET_LEN];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| TotpError::Entropy(e.to_string()))?;

    Ok(base32::encode(BASE32, &bytes))
}

/// Build the `otpauth://` URI that authenticator apps import.
///
/// Label and issuer are percent-encoded; an issuer with a space would
/// otherwise produce a URI some apps refuse to scan.
pub fn provisioning_uri(issuer: &str, account: &str, secret: &str) -> String {
    format!(
        "otpauth://totp/{}:{}?secret={}&issuer={}&algorithm=SHA1&digits={}&period={}",
        urlencoding::encode(issuer),
        urlencoding::encode(account),
        secret,
        urlencoding::encode(issuer),
        DIGITS,
        PERIOD
    )
}

/// Compute the code for a given counter value (RFC 4226 HOTP with dynamic
/// truncation, reduced to `DIGITS` decimal digits).
fn hotp(key: &[u8], counter: u64) -> String {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = ((digest[offset] as u32 & 0x7f) << 24)
        | ((digest[offset + 1] as u32) << 16)
        | ((digest[offset + 2] as u32) << 8)
        | (digest[offset + 3] as u32);

    let code = binary % 10u32.pow(DIGITS as u32);
    format!("{:0width$}", code, width = DIGITS)
}

fn decode_secret(secret: &str) -> Result<Vec<u8>, TotpError> {
    base32::decode(BASE32, secret).ok_or(TotpError::InvalidSecret)
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Compute the code for a specific Unix timestamp.
pub fn code_at(secret: &str, timestamp: u64) -> Result<String, TotpError> {
    let key = decode_secret(secret)?;
    Ok(hotp(&key, timestamp / PERIOD))
}

/// Compute the code for the current time step.
pub fn current_code(secret: &str) -> Result<String, TotpError> {
    code_at(secret, unix_now())
}

/// Verify a submitted code against the secret at the current time.
///
/// Counters in `[now - window, now + window]` are all accepted, tolerating
/// clock drift on the client side. Comparison is constant-time.
pub fn verify(secret: &str, code: &str, window: u64) -> Result<bool, TotpError> {
    verify_at(secret, code, window, unix_now())
}

/// Verify against a specific timestamp. Separated out so tests can pin time.
pub fn verify_at(secret: &str, code: &str, window: u64, timestamp: u64) -> Result<bool, TotpError> {
    // Shape check comes first: anything that is not exactly 6 ASCII digits
    // is rejected before any HMAC work.
    if code.len() != DIGITS || !code.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TotpError::MalformedCode);
    }

    let key = decode_secret(secret)?;
    let current = (timestamp / PERIOD) as i64;

    for offset in -(window as i64)..=(window as i64) {
        let counter = current + offset;
        if counter < 0 {
            continue;
        }

        let candidate = hotp(&key, counter as u64);
        if constant_time_eq(candidate.as_bytes(), code.as_bytes()) {
            return Ok(true);
        }
    }

    Ok(false)
}

/// Constant-time byte comparison to keep code checks free of timing leaks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }

    result == 0
}
