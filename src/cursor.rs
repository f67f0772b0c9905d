//! Page tokens for resumable list scans.
//!
//! A token wraps the store's resume position and the number of records the
//! page that produced it returned. Tokens are opaque to callers: the payload
//! is a versioned bitcode record with a SHA-256 check value, encoded as
//! URL-safe base64 without padding. Anything that does not decode to a
//! payload with a matching check value is rejected.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Page size used when the caller asks for zero or a negative number.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a caller can ask for.
pub const MAX_PAGE_SIZE: usize = 1000;

const CURSOR_VERSION: u8 = 1;

/// Clamp a requested page size into `[1, MAX_PAGE_SIZE]`.
pub fn bound_page_size(requested: i32) -> usize {
    PageSizePolicy::default().bound(requested)
}

/// Default and maximum page sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizePolicy {
    pub default: usize,
    pub max: usize,
}

impl Default for PageSizePolicy {
    fn default() -> Self {
        Self {
            default: DEFAULT_PAGE_SIZE,
            max: MAX_PAGE_SIZE,
        }
    }
}

impl PageSizePolicy {
    pub fn bound(&self, requested: i32) -> usize {
        let max = self.max.max(1);
        match usize::try_from(requested) {
            Ok(0) | Err(_) => self.default.clamp(1, max),
            Ok(size) => size.min(max),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    Encoding(String),
    Payload(String),
    UnsupportedVersion(u8),
    Tampered,
}

impl fmt::Display for CursorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorError::Encoding(msg) => write!(f, "invalid page token encoding: {}", msg),
            CursorError::Payload(msg) => write!(f, "invalid page token payload: {}", msg),
            CursorError::UnsupportedVersion(version) => {
                write!(f, "unsupported page token version {}", version)
            }
            CursorError::Tampered => write!(f, "page token failed its integrity check"),
        }
    }
}

impl std::error::Error for CursorError {}

#[derive(Serialize, Deserialize)]
struct CursorPayload {
    version: u8,
    resume: Vec<u8>,
    returned: u64,
    check: u64,
}

/// Decoded page token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageCursor {
    resume: Vec<u8>,
    returned: u64,
}

impl PageCursor {
    pub fn new(resume: Vec<u8>, returned: u64) -> Self {
        Self { resume, returned }
    }

    /// The position at the very start of a scan.
    pub fn start() -> Self {
        Self::default()
    }

    pub fn is_start(&self) -> bool {
        self.resume.is_empty()
    }

    pub fn resume(&self) -> &[u8] {
        &self.resume
    }

    pub fn into_resume(self) -> Vec<u8> {
        self.resume
    }

    /// Records returned by the page that produced this token.
    pub fn returned(&self) -> u64 {
        self.returned
    }

    pub fn encode(&self) -> String {
        let payload = CursorPayload {
            version: CURSOR_VERSION,
            resume: self.resume.clone(),
            returned: self.returned,
            check: check_value(CURSOR_VERSION, &self.resume, self.returned),
        };
        // Serializing plain integers and bytes cannot fail.
        let bytes = bitcode::serialize(&payload).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(bytes)
    }

    /// Decode a token. The empty string is the start of a scan.
    pub fn decode(token: &str) -> Result<Self, CursorError> {
        if token.is_empty() {
            return Ok(Self::start());
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|e| CursorError::Encoding(e.to_string()))?;
        let payload: CursorPayload =
            bitcode::deserialize(&bytes).map_err(|e| CursorError::Payload(e.to_string()))?;

        if payload.version != CURSOR_VERSION {
            return Err(CursorError::UnsupportedVersion(payload.version));
        }
        if payload.check != check_value(payload.version, &payload.resume, payload.returned) {
            return Err(CursorError::Tampered);
        }

        Ok(Self {
            resume: payload.resume,
            returned: payload.returned,
        })
    }
}

fn check_value(version: u8, resume: &[u8], returned: u64) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    hasher.update((resume.len() as u64).to_le_bytes());
    hasher.update(resume);
    hasher.update(returned.to_le_bytes());
    let digest = hasher.finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}
