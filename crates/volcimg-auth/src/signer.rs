//! Request signing.
//!
//! [`sign`] turns a [`SigningInput`] into the headers a request must carry:
//!
//! 1. Hash the body (`x-content-sha256`).
//! 2. Build the canonical request over the four signed headers.
//! 3. Build the string to sign from the timestamp, credential scope, and the
//!    canonical request hash.
//! 4. Derive a scope-limited signing key through a four-step HMAC chain.
//! 5. Sign and assemble the `Authorization` header.
//!
//! Signing is pure: the timestamp is part of the input, so the same input
//! always produces the same [`SigningResult`].

use chrono::{DateTime, SubsecRound, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::canonical::{SIGNED_HEADERS, build_canonical_request, build_signed_headers_string};

/// Algorithm tag that opens both the string to sign and the `Authorization` header.
pub const ALGORITHM: &str = "HMAC-SHA256";

/// Last component of every credential scope.
pub const SCOPE_TERMINATOR: &str = "request";

/// The only content type this client sends; it is part of the signature.
pub const CONTENT_TYPE_JSON: &str = "application/json";

const ISO_TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";
const SHORT_DATE_FORMAT: &str = "%Y%m%d";

type HmacSha256 = Hmac<Sha256>;

/// Everything a signature depends on.
#[derive(Debug, Clone, Copy)]
pub struct SigningInput<'a> {
    /// HTTP method, e.g. `POST`.
    pub method: &'a str,
    /// Canonical URI path, e.g. `/`.
    pub canonical_uri: &'a str,
    /// Canonical query string. Must byte-match the query sent on the wire.
    pub canonical_query_string: &'a str,
    /// Exact body bytes that will be sent.
    pub body: &'a [u8],
    /// Value of the `Host` header.
    pub host: &'a str,
    /// Service name in the credential scope.
    pub service: &'a str,
    /// Region in the credential scope.
    pub region: &'a str,
    /// Access key ID placed in the credential.
    pub access_key_id: &'a str,
    /// Secret key the signing key is derived from.
    pub secret_key: &'a str,
    /// Signing instant. Sub-second precision is ignored.
    pub timestamp: DateTime<Utc>,
}

/// Output of [`sign`]. Built fresh for every request and never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningResult {
    /// `x-date` value, `YYYYMMDDTHHMMSSZ`.
    pub iso_timestamp: String,
    /// Credential scope date, `YYYYMMDD`.
    pub short_date: String,
    /// `x-content-sha256` value: hex SHA-256 of the body.
    pub content_hash: String,
    /// Complete `Authorization` header value.
    pub authorization_header: String,
}

/// Current UTC time truncated to whole seconds.
///
/// Capture this once per request and pass it into [`SigningInput`]; reading
/// the clock twice could put `x-date` and the credential scope on different
/// sides of a second (or midnight) boundary.
#[must_use]
pub fn signing_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

/// Sign a request.
///
/// # Examples
///
/// ```
/// use volcimg_auth::signer::{SigningInput, sign};
///
/// let input = SigningInput {
///     method: "POST",
///     canonical_uri: "/",
///     canonical_query_string: "Action=CVProcess&Version=2022-08-31",
///     body: b"",
///     host: "visual.volcengineapi.com",
///     service: "cv",
///     region: "cn-north-1",
///     access_key_id: "AKEXAMPLE",
///     secret_key: "testsecret",
///     timestamp: chrono::DateTime::from_timestamp(1_715_308_243, 0).unwrap(),
/// };
/// let result = sign(&input);
/// assert_eq!(result.short_date, "20240510");
/// assert_eq!(result, sign(&input));
/// ```
#[must_use]
pub fn sign(input: &SigningInput<'_>) -> SigningResult {
    let iso_timestamp = input.timestamp.format(ISO_TIMESTAMP_FORMAT).to_string();
    let short_date = input.timestamp.format(SHORT_DATE_FORMAT).to_string();
    let content_hash = hash_payload(input.body);

    let (scope, string_to_sign) =
        scoped_string_to_sign(input, &iso_timestamp, &short_date, &content_hash);

    let signing_key = derive_signing_key(input.secret_key, &short_date, input.region, input.service);
    let signature = compute_signature(&signing_key, &string_to_sign);

    let authorization_header = format_authorization_header(
        input.access_key_id,
        &scope,
        &build_signed_headers_string(&SIGNED_HEADERS),
        &signature,
    );

    SigningResult {
        iso_timestamp,
        short_date,
        content_hash,
        authorization_header,
    }
}

/// Canonicalize `input` and return its credential scope and string to sign.
fn scoped_string_to_sign(
    input: &SigningInput<'_>,
    iso_timestamp: &str,
    short_date: &str,
    content_hash: &str,
) -> (String, String) {
    let headers = [
        ("content-type", CONTENT_TYPE_JSON),
        ("host", input.host),
        ("x-content-sha256", content_hash),
        ("x-date", iso_timestamp),
    ];

    let canonical_request = build_canonical_request(
        input.method,
        input.canonical_uri,
        input.canonical_query_string,
        &headers,
        &SIGNED_HEADERS,
        content_hash,
    );
    debug!(canonical_request, "Built canonical request");

    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let scope = credential_scope(short_date, input.region, input.service);
    let string_to_sign = build_string_to_sign(iso_timestamp, &scope, &canonical_hash);
    debug!(string_to_sign, "Built string to sign");

    (scope, string_to_sign)
}

/// Credential scope: `date/region/service/request`.
#[must_use]
pub fn credential_scope(short_date: &str, region: &str, service: &str) -> String {
    format!("{short_date}/{region}/{service}/{SCOPE_TERMINATOR}")
}

/// Build the string to sign.
///
/// ```text
/// HMAC-SHA256\n
/// <ISO timestamp>\n
/// <credential scope>\n
/// <hex(SHA256(canonical request))>
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the signing key.
///
/// ```text
/// DateKey              = HMAC-SHA256(secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "request")
/// ```
///
/// Every step is keyed by the raw bytes of the previous one, and the secret
/// carries no prefix.
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let date_key = hmac_sha256(secret_key.as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    hmac_sha256(&date_region_service_key, SCOPE_TERMINATOR.as_bytes())
}

/// Hex-encoded HMAC-SHA256 of `data` under `signing_key`.
#[must_use]
pub fn compute_signature(signing_key: &[u8], data: &str) -> String {
    hex::encode(hmac_sha256(signing_key, data.as_bytes()))
}

/// Assemble the `Authorization` header value.
#[must_use]
pub fn format_authorization_header(
    access_key_id: &str,
    credential_scope: &str,
    signed_headers: &str,
    signature: &str,
) -> String {
    format!(
        "{ALGORITHM} Credential={access_key_id}/{credential_scope}, \
         SignedHeaders={signed_headers}, Signature={signature}"
    )
}

/// Hex-encoded SHA-256 of a payload (the `x-content-sha256` value).
///
/// # Examples
///
/// ```
/// use volcimg_auth::signer::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

pub(crate) fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &str = "testsecret";
    const TEST_DATE: &str = "20240510";
    const TEST_REGION: &str = "cn-north-1";
    const TEST_SERVICE: &str = "cv";

    // Reference values computed independently of this crate.
    const REFERENCE_SIGNING_KEY: &str =
        "aa72422d64f01aee3c5874202b937e9234618c9557c3db37c616bc9cae95130a";
    const REFERENCE_BODY: &[u8] = br#"{"req_key":"high_aes_general_v30l_zt2i","prompt":"a red fox","seed":-1,"scale":2.5,"width":1328,"height":1328}"#;
    const REFERENCE_BODY_HASH: &str =
        "3552b3f31f0a121d91ad1c0c3b750c420e35be100bba606bf7fd35443bf03ccf";
    const REFERENCE_SIGNATURE: &str =
        "2c310f0748f84f01d061a74c55848b4870473fae06ed481cca2f854905a7f830";

    fn reference_timestamp() -> DateTime<Utc> {
        // 2024-05-10T02:30:43Z
        DateTime::from_timestamp(1_715_308_243, 0).unwrap()
    }

    fn reference_input(body: &[u8]) -> SigningInput<'_> {
        SigningInput {
            method: "POST",
            canonical_uri: "/",
            canonical_query_string: "Action=CVProcess&Version=2022-08-31",
            body,
            host: "visual.volcengineapi.com",
            service: TEST_SERVICE,
            region: TEST_REGION,
            access_key_id: "AKTEST",
            secret_key: TEST_SECRET,
            timestamp: reference_timestamp(),
        }
    }

    fn signature_of(result: &SigningResult) -> &str {
        result
            .authorization_header
            .rsplit_once("Signature=")
            .map(|(_, sig)| sig)
            .unwrap()
    }

    #[test]
    fn test_should_derive_signing_key_matching_reference_vector() {
        let key = derive_signing_key(TEST_SECRET, TEST_DATE, TEST_REGION, TEST_SERVICE);
        assert_eq!(key.len(), 32);
        assert_eq!(hex::encode(key), REFERENCE_SIGNING_KEY);
    }

    #[test]
    fn test_should_change_signature_when_any_two_chain_stages_are_swapped() {
        let input = reference_input(REFERENCE_BODY);
        let (_, string_to_sign) = scoped_string_to_sign(
            &input,
            "20240510T023043Z",
            TEST_DATE,
            REFERENCE_BODY_HASH,
        );
        let stages = [TEST_DATE, TEST_REGION, TEST_SERVICE, SCOPE_TERMINATOR];
        let chain_signature = |chain: &[&str; 4]| {
            let mut key = TEST_SECRET.as_bytes().to_vec();
            for stage in chain {
                key = hmac_sha256(&key, stage.as_bytes());
            }
            compute_signature(&key, &string_to_sign)
        };

        assert_eq!(chain_signature(&stages), REFERENCE_SIGNATURE);

        let mut swaps = 0;
        for i in 0..stages.len() {
            for j in i + 1..stages.len() {
                let mut chain = stages;
                chain.swap(i, j);
                assert_ne!(
                    chain_signature(&chain),
                    REFERENCE_SIGNATURE,
                    "chain {chain:?} must not match"
                );
                swaps += 1;
            }
        }
        assert_eq!(swaps, 6);
    }

    #[test]
    fn test_should_not_prefix_secret_key() {
        let prefixed = derive_signing_key("AWS4testsecret", TEST_DATE, TEST_REGION, TEST_SERVICE);
        assert_ne!(hex::encode(prefixed), REFERENCE_SIGNING_KEY);
    }

    #[test]
    fn test_should_sign_reference_request() {
        let result = sign(&reference_input(REFERENCE_BODY));

        assert_eq!(result.iso_timestamp, "20240510T023043Z");
        assert_eq!(result.short_date, "20240510");
        assert_eq!(result.content_hash, REFERENCE_BODY_HASH);
        assert_eq!(
            result.authorization_header,
            format!(
                "HMAC-SHA256 Credential=AKTEST/20240510/cn-north-1/cv/request, \
                 SignedHeaders=content-type;host;x-content-sha256;x-date, \
                 Signature={REFERENCE_SIGNATURE}"
            )
        );
    }

    #[test]
    fn test_should_be_deterministic() {
        let input = reference_input(REFERENCE_BODY);
        assert_eq!(sign(&input), sign(&input));
    }

    #[test]
    fn test_should_ignore_subsecond_precision() {
        let mut input = reference_input(REFERENCE_BODY);
        let base = sign(&input);
        input.timestamp = DateTime::from_timestamp(1_715_308_243, 999_000_000).unwrap();
        assert_eq!(sign(&input), base);
    }

    #[test]
    fn test_should_change_hash_and_signature_for_any_body_byte() {
        let base = sign(&reference_input(REFERENCE_BODY));
        let mut seen = std::collections::HashSet::new();
        seen.insert(signature_of(&base).to_owned());

        for position in 0..REFERENCE_BODY.len() {
            let mut body = REFERENCE_BODY.to_vec();
            body[position] ^= 0x01;
            let result = sign(&reference_input(&body));
            assert_ne!(result.content_hash, base.content_hash);
            assert!(
                seen.insert(signature_of(&result).to_owned()),
                "signature collision at byte {position}"
            );
        }
    }

    #[test]
    fn test_should_change_signature_with_secret() {
        let mut input = reference_input(REFERENCE_BODY);
        let base = sign(&input);
        input.secret_key = "othersecret";
        let other = sign(&input);
        assert_eq!(base.content_hash, other.content_hash);
        assert_ne!(signature_of(&base), signature_of(&other));
    }

    #[test]
    fn test_should_build_string_to_sign() {
        let sts = build_string_to_sign(
            "20240510T023043Z",
            &credential_scope(TEST_DATE, TEST_REGION, TEST_SERVICE),
            "abc",
        );
        assert_eq!(
            sts,
            "HMAC-SHA256\n20240510T023043Z\n20240510/cn-north-1/cv/request\nabc"
        );
    }

    #[test]
    fn test_should_truncate_signing_timestamp_to_seconds() {
        assert_eq!(signing_timestamp().timestamp_subsec_nanos(), 0);
    }
}
