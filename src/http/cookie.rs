//! Cookie encoding, signing and parsing.
//!
//! # Responsibilities
//! - Encode cookie values: plain strings as-is, structured values as `j:` + JSON
//! - Sign values with HMAC-SHA256 (`s:` + value + `.` + signature)
//! - Serialize `Set-Cookie` entries with their attributes
//! - Parse incoming `Cookie` headers, verifying and decoding tagged values
//!
//! # Design Decisions
//! - Signature is unpadded standard base64, compared in constant time
//! - Verification failures drop the cookie silently; they are never errors
//! - `max_age` is given in milliseconds and emitted in whole seconds
//! - The jar keeps one entry per name; re-setting a name moves it to the end

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Datelike, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

const SIGNED_PREFIX: &str = "s:";
const JSON_PREFIX: &str = "j:";

/// Errors raised while building a `Set-Cookie` entry.
#[derive(Debug, Error)]
pub enum CookieError {
    #[error("argument name is invalid: {0:?}")]
    InvalidName(String),

    #[error("option path is invalid: {0:?}")]
    InvalidPath(String),

    #[error("option domain is invalid: {0:?}")]
    InvalidDomain(String),

    #[error("option expires is invalid")]
    InvalidExpires,

    #[error("option priority is invalid: {0:?}")]
    InvalidPriority(String),

    #[error("option sameSite is invalid: {0:?}")]
    InvalidSameSite(String),

    #[error("cookie value could not be serialized: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cookie secret is unusable")]
    Secret,
}

/// `Priority` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl FromStr for Priority {
    type Err = CookieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(CookieError::InvalidPriority(s.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        })
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl FromStr for SameSite {
    type Err = CookieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            _ => Err(CookieError::InvalidSameSite(s.to_string())),
        }
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

/// Options accepted when setting a cookie.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieOptions {
    /// Defaults to `/`.
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Lifetime in milliseconds.
    pub max_age: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
    pub http_only: bool,
    pub secure: bool,
    pub partitioned: bool,
    pub priority: Option<Priority>,
    pub same_site: Option<SameSite>,
    /// Sign the value with the configured secret. Never emitted.
    pub signed: bool,
}

impl CookieOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn max_age_ms(mut self, ms: i64) -> Self {
        self.max_age = Some(ms);
        self
    }

    pub fn expires(mut self, at: DateTime<Utc>) -> Self {
        self.expires = Some(at);
        self
    }

    pub fn http_only(mut self, on: bool) -> Self {
        self.http_only = on;
        self
    }

    pub fn secure(mut self, on: bool) -> Self {
        self.secure = on;
        self
    }

    pub fn partitioned(mut self, on: bool) -> Self {
        self.partitioned = on;
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn same_site(mut self, same_site: SameSite) -> Self {
        self.same_site = Some(same_site);
        self
    }

    pub fn signed(mut self, on: bool) -> Self {
        self.signed = on;
        self
    }
}

/// Wire-level attributes after normalization: `signed` is gone and
/// `max_age` is in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct WireOptions {
    pub path: String,
    pub domain: Option<String>,
    pub max_age_secs: Option<i64>,
    pub expires: Option<DateTime<Utc>>,
    pub http_only: bool,
    pub secure: bool,
    pub partitioned: bool,
    pub priority: Option<Priority>,
    pub same_site: Option<SameSite>,
}

impl WireOptions {
    /// Apply the default path and the millisecond → second conversion.
    ///
    /// A lifetime that rounds to exactly one second also gets an absolute
    /// `Expires` at the epoch.
    pub fn normalize(options: &CookieOptions) -> Self {
        let max_age_secs = options.max_age.map(|ms| ms / 1000);
        let expires = match max_age_secs {
            Some(1) => Some(DateTime::<Utc>::UNIX_EPOCH),
            _ => options.expires,
        };

        Self {
            path: options.path.clone().unwrap_or_else(|| "/".to_string()),
            domain: options.domain.clone(),
            max_age_secs,
            expires,
            http_only: options.http_only,
            secure: options.secure,
            partitioned: options.partitioned,
            priority: options.priority,
            same_site: options.same_site,
        }
    }
}

/// A cookie value before encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum CookieValue {
    Text(String),
    Json(Value),
}

impl From<&str> for CookieValue {
    fn from(value: &str) -> Self {
        CookieValue::Text(value.to_string())
    }
}

impl From<String> for CookieValue {
    fn from(value: String) -> Self {
        CookieValue::Text(value)
    }
}

impl From<Value> for CookieValue {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => CookieValue::Text(s),
            other => CookieValue::Json(other),
        }
    }
}

impl From<i64> for CookieValue {
    fn from(value: i64) -> Self {
        CookieValue::Json(Value::from(value))
    }
}

impl From<bool> for CookieValue {
    fn from(value: bool) -> Self {
        CookieValue::Json(Value::Bool(value))
    }
}

/// HMAC signer bound to one secret.
#[derive(Clone)]
pub struct CookieSigner {
    mac: HmacSha256,
}

impl fmt::Debug for CookieSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CookieSigner").finish_non_exhaustive()
    }
}

impl CookieSigner {
    pub fn new(secret: &str) -> Result<Self, CookieError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| CookieError::Secret)?;
        Ok(Self { mac })
    }

    /// Append `.` and the signature to `value`.
    pub fn sign(&self, value: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        let signature = STANDARD_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{}.{}", value, signature)
    }

    /// Verify a signed value and return the original, or `None` on mismatch.
    pub fn unsign<'a>(&self, signed: &'a str) -> Option<&'a str> {
        let (value, signature) = signed.rsplit_once('.')?;
        let signature = STANDARD_NO_PAD.decode(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(value.as_bytes());
        mac.verify_slice(&signature).ok()?;
        Some(value)
    }
}

/// Encodes outgoing cookie values and decodes incoming cookie headers.
#[derive(Debug, Clone)]
pub struct CookieCodec {
    signer: CookieSigner,
}

impl CookieCodec {
    pub fn new(secret: &str) -> Result<Self, CookieError> {
        Ok(Self {
            signer: CookieSigner::new(secret)?,
        })
    }

    pub fn signer(&self) -> &CookieSigner {
        &self.signer
    }

    /// Produce the stored (pre-URL-encoding) form of a value.
    pub fn encode_value(&self, value: &CookieValue, signed: bool) -> Result<String, CookieError> {
        let encoded = match value {
            CookieValue::Text(text) => text.clone(),
            CookieValue::Json(json) => format!("{}{}", JSON_PREFIX, serde_json::to_string(json)?),
        };
        if signed {
            return Ok(format!("{}{}", SIGNED_PREFIX, self.signer.sign(&encoded)));
        }
        Ok(encoded)
    }

    /// Parse a `Cookie` header into decoded values.
    ///
    /// Entries are separated by `,` and `;`. Every `name=value` pair is a
    /// cookie, whatever its name. The first occurrence of a name wins.
    pub fn parse(&self, header: &str) -> HashMap<String, Value> {
        let mut cookies = HashMap::new();

        for entry in header.split(',') {
            for pair in entry.split(';') {
                let Some((name, raw)) = pair.split_once('=') else {
                    continue;
                };
                let name = name.trim();
                if name.is_empty() || cookies.contains_key(name) {
                    continue;
                }
                if let Some(value) = self.decode_value(raw) {
                    cookies.insert(name.to_string(), value);
                }
            }
        }
        cookies
    }

    fn decode_value(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        let raw = raw
            .strip_prefix('"')
            .and_then(|r| r.strip_suffix('"'))
            .unwrap_or(raw);
        let decoded = match urlencoding::decode(raw) {
            Ok(text) => text.into_owned(),
            Err(_) => raw.to_string(),
        };

        let unsigned = match decoded.strip_prefix(SIGNED_PREFIX) {
            Some(signed) => self.signer.unsign(signed)?.to_string(),
            None => decoded,
        };

        if let Some(json) = unsigned.strip_prefix(JSON_PREFIX) {
            return serde_json::from_str(json).ok();
        }
        Some(serde_json::from_str(&unsigned).unwrap_or(Value::String(unsigned)))
    }
}

/// Serialize one `Set-Cookie` entry. `value` is URL-encoded here.
pub fn serialize(name: &str, value: &str, options: &WireOptions) -> Result<String, CookieError> {
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(CookieError::InvalidName(name.to_string()));
    }

    let mut out = format!("{}={}", name, encode_component(value));

    if let Some(max_age) = options.max_age_secs {
        out.push_str(&format!("; Max-Age={}", max_age));
    }
    if let Some(domain) = &options.domain {
        if !is_attribute_value(domain) || domain.is_empty() {
            return Err(CookieError::InvalidDomain(domain.clone()));
        }
        out.push_str(&format!("; Domain={}", domain));
    }
    if !is_attribute_value(&options.path) {
        return Err(CookieError::InvalidPath(options.path.clone()));
    }
    out.push_str(&format!("; Path={}", options.path));
    if let Some(expires) = options.expires {
        out.push_str(&format!("; Expires={}", http_date(&expires)?));
    }
    if options.http_only {
        out.push_str("; HttpOnly");
    }
    if options.secure {
        out.push_str("; Secure");
    }
    if options.partitioned {
        out.push_str("; Partitioned");
    }
    if let Some(priority) = options.priority {
        out.push_str(&format!("; Priority={}", priority));
    }
    if let Some(same_site) = options.same_site {
        out.push_str(&format!("; SameSite={}", same_site));
    }
    Ok(out)
}

/// IMF-fixdate, e.g. `Thu, 01 Jan 1970 00:00:00 GMT`.
pub fn http_date(at: &DateTime<Utc>) -> Result<String, CookieError> {
    if !(0..=9999).contains(&at.year()) {
        return Err(CookieError::InvalidExpires);
    }
    Ok(at.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
}

/// Percent-encode like `encodeURIComponent`: `!'()*` stay literal.
fn encode_component(value: &str) -> String {
    const KEPT: [(&str, &str); 5] = [("%21", "!"), ("%27", "'"), ("%28", "("), ("%29", ")"), ("%2A", "*")];
    let mut encoded = urlencoding::encode(value).into_owned();
    for (escaped, literal) in KEPT {
        if encoded.contains(escaped) {
            encoded = encoded.replace(escaped, literal);
        }
    }
    encoded
}

fn is_token_byte(b: u8) -> bool {
    matches!(b,
        b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'-' | b'.' | b'^' | b'_' | b'`' | b'|' | b'~'
    ) || b.is_ascii_alphanumeric()
}

fn is_attribute_value(value: &str) -> bool {
    !value.chars().any(|c| c == ';' || c.is_control())
}

#[derive(Debug, Clone)]
struct JarEntry {
    name: String,
    serialized: String,
}

/// Pending outbound cookies for one response.
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    entries: Vec<JarEntry>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a serialized entry; an existing entry with the same name is replaced
    /// and moves to the end.
    pub fn insert(&mut self, name: &str, serialized: String) {
        self.entries.retain(|e| e.name != name);
        self.entries.push(JarEntry {
            name: name.to_string(),
            serialized,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// All entries joined into one header value.
    pub fn header_value(&self) -> Option<String> {
        if self.entries.is_empty() {
            return None;
        }
        let joined: Vec<&str> = self.entries.iter().map(|e| e.serialized.as_str()).collect();
        Some(joined.join(","))
    }
}
