//! HTTP-specific constants.

/// Header carrying the base64 payment payload (client → resource server).
pub const X_PAYMENT_HEADER: &str = "X-PAYMENT";

/// x402 protocol version spoken to facilitators.
pub const X402_VERSION: u8 = 1;

/// The only payment scheme this crate produces.
pub const EXACT_SCHEME: &str = "exact";

/// Content type of newline-delimited JSON progress streams.
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// Default facilitator service URL.
pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator";
