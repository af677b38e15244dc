//! Signature verification.
//!
//! This is the receiving side of [`crate::signer::sign`]: given the request a
//! server actually received, recompute the signature and compare it with the
//! one in the `Authorization` header.
//!
//! 1. Parse the `Authorization` header.
//! 2. Check `x-content-sha256` against the received body.
//! 3. Rebuild the canonical request from the received method, path, query and
//!    signed headers.
//! 4. Derive the signing key and compare signatures in constant time.
//!
//! The main entry point is [`verify_request`].

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::debug;

use crate::canonical::{build_canonical_request, build_canonical_uri};
use crate::credentials::CredentialProvider;
use crate::error::AuthError;
use crate::signer::{
    ALGORITHM, SCOPE_TERMINATOR, build_string_to_sign, compute_signature, credential_scope,
    derive_signing_key, hash_payload,
};

/// The result of a successful verification.
#[derive(Debug, Clone)]
pub struct AuthResult {
    /// The access key ID that signed the request.
    pub access_key_id: String,
    /// The region from the credential scope.
    pub region: String,
    /// The service from the credential scope.
    pub service: String,
    /// The headers that were included in the signature.
    pub signed_headers: Vec<String>,
}

/// Parsed components of an `Authorization` header.
///
/// Format:
/// ```text
/// HMAC-SHA256 Credential=AKID/20240510/cn-north-1/cv/request,
///   SignedHeaders=content-type;host;x-content-sha256;x-date,
///   Signature=<hex-signature>
/// ```
#[derive(Debug, Clone)]
pub struct ParsedAuth {
    /// The access key ID.
    pub access_key_id: String,
    /// The date component of the credential scope (YYYYMMDD).
    pub date: String,
    /// The region from the credential scope.
    pub region: String,
    /// The service from the credential scope.
    pub service: String,
    /// Signed header names, lowercase.
    pub signed_headers: Vec<String>,
    /// The hex-encoded signature.
    pub signature: String,
}

/// Parse an `Authorization` header value.
///
/// # Errors
///
/// Returns [`AuthError::InvalidAuthHeader`] if a component is missing,
/// [`AuthError::UnsupportedAlgorithm`] for any algorithm other than
/// `HMAC-SHA256`, and [`AuthError::InvalidCredential`] for a malformed scope.
pub fn parse_authorization_header(header: &str) -> Result<ParsedAuth, AuthError> {
    let (algorithm, rest) = header.split_once(' ').ok_or(AuthError::InvalidAuthHeader)?;

    if algorithm != ALGORITHM {
        return Err(AuthError::UnsupportedAlgorithm(algorithm.to_owned()));
    }

    let mut credential = None;
    let mut signed_headers = None;
    let mut signature = None;

    for part in rest.split(',') {
        let part = part.trim();
        if let Some(value) = part.strip_prefix("Credential=") {
            credential = Some(value);
        } else if let Some(value) = part.strip_prefix("SignedHeaders=") {
            signed_headers = Some(value);
        } else if let Some(value) = part.strip_prefix("Signature=") {
            signature = Some(value);
        }
    }

    let credential = credential.ok_or(AuthError::InvalidAuthHeader)?;
    let signed_headers = signed_headers.ok_or(AuthError::InvalidAuthHeader)?;
    let signature = signature.ok_or(AuthError::InvalidAuthHeader)?;

    // AKID/date/region/service/request
    let cred_parts: Vec<&str> = credential.splitn(5, '/').collect();
    if cred_parts.len() != 5 || cred_parts[4] != SCOPE_TERMINATOR {
        return Err(AuthError::InvalidCredential);
    }

    Ok(ParsedAuth {
        access_key_id: cred_parts[0].to_owned(),
        date: cred_parts[1].to_owned(),
        region: cred_parts[2].to_owned(),
        service: cred_parts[3].to_owned(),
        signed_headers: signed_headers.split(';').map(ToOwned::to_owned).collect(),
        signature: signature.to_owned(),
    })
}

/// Verify a signed request against its body.
///
/// # Errors
///
/// Returns an [`AuthError`] if the `Authorization` header is missing or
/// malformed, the access key is unknown, a signed header is missing, the
/// scope date disagrees with `x-date`, the body hash does not match, or the
/// signature does not match.
pub fn verify_request(
    parts: &http::request::Parts,
    body: &[u8],
    credential_provider: &dyn CredentialProvider,
) -> Result<AuthResult, AuthError> {
    let auth_header = parts
        .headers
        .get(http::header::AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    debug!(auth_header, "Parsing authorization header");

    let parsed = parse_authorization_header(auth_header)?;
    let secret_key = credential_provider.get_secret_key(&parsed.access_key_id)?;

    let timestamp = extract_header_value(parts, "x-date")?;
    if !timestamp.starts_with(&parsed.date) {
        return Err(AuthError::DateMismatch {
            scope: parsed.date,
            timestamp,
        });
    }

    let content_hash = extract_header_value(parts, "x-content-sha256")?;
    let body_hash = hash_payload(body);
    if !bool::from(content_hash.as_bytes().ct_eq(body_hash.as_bytes())) {
        return Err(AuthError::ContentHashMismatch);
    }

    debug!(
        access_key_id = %parsed.access_key_id,
        date = %parsed.date,
        region = %parsed.region,
        service = %parsed.service,
        "Verifying request signature"
    );

    let signed_header_refs: Vec<&str> = parsed.signed_headers.iter().map(String::as_str).collect();
    let header_pairs = collect_signed_headers(parts, &signed_header_refs)?;

    let canonical_request = build_canonical_request(
        parts.method.as_str(),
        &build_canonical_uri(parts.uri.path()),
        parts.uri.query().unwrap_or(""),
        &header_pairs,
        &signed_header_refs,
        &body_hash,
    );
    debug!(canonical_request, "Rebuilt canonical request");

    let canonical_hash = hex::encode(Sha256::digest(canonical_request.as_bytes()));
    let scope = credential_scope(&parsed.date, &parsed.region, &parsed.service);
    let string_to_sign = build_string_to_sign(&timestamp, &scope, &canonical_hash);

    let signing_key =
        derive_signing_key(&secret_key, &parsed.date, &parsed.region, &parsed.service);
    let expected_signature = compute_signature(&signing_key, &string_to_sign);

    if parsed
        .signature
        .as_bytes()
        .ct_eq(expected_signature.as_bytes())
        .into()
    {
        debug!(access_key_id = %parsed.access_key_id, "Signature verification succeeded");
        Ok(AuthResult {
            access_key_id: parsed.access_key_id,
            region: parsed.region,
            service: parsed.service,
            signed_headers: parsed.signed_headers,
        })
    } else {
        debug!(
            expected = %expected_signature,
            provided = %parsed.signature,
            "Signature mismatch"
        );
        Err(AuthError::SignatureDoesNotMatch)
    }
}

fn extract_header_value(parts: &http::request::Parts, name: &str) -> Result<String, AuthError> {
    parts
        .headers
        .get(name)
        .ok_or_else(|| AuthError::MissingHeader(name.to_owned()))?
        .to_str()
        .map(ToOwned::to_owned)
        .map_err(|_| AuthError::MissingHeader(name.to_owned()))
}

fn collect_signed_headers<'a>(
    parts: &'a http::request::Parts,
    signed_headers: &[&'a str],
) -> Result<Vec<(&'a str, &'a str)>, AuthError> {
    let mut result = Vec::with_capacity(signed_headers.len());

    for &name in signed_headers {
        let value = parts
            .headers
            .get(name)
            .ok_or_else(|| AuthError::MissingHeader(name.to_owned()))?
            .to_str()
            .map_err(|_| AuthError::MissingHeader(name.to_owned()))?;
        result.push((name, value));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;

    use super::*;
    use crate::credentials::StaticCredentialProvider;
    use crate::signer::{CONTENT_TYPE_JSON, SigningInput, SigningResult, sign};

    const ACCESS_KEY: &str = "AKTEST";
    const SECRET_KEY: &str = "testsecret";
    const HOST: &str = "visual.volcengineapi.com";
    const QUERY: &str = "Action=CVProcess&Version=2022-08-31";
    const BODY: &[u8] = br#"{"prompt":"a lighthouse at dusk"}"#;

    fn provider() -> StaticCredentialProvider {
        StaticCredentialProvider::new(vec![(ACCESS_KEY.to_owned(), SECRET_KEY.to_owned())])
    }

    fn signed() -> SigningResult {
        sign(&SigningInput {
            method: "POST",
            canonical_uri: "/",
            canonical_query_string: QUERY,
            body: BODY,
            host: HOST,
            service: "cv",
            region: "cn-north-1",
            access_key_id: ACCESS_KEY,
            secret_key: SECRET_KEY,
            timestamp: DateTime::from_timestamp(1_715_308_243, 0).unwrap(),
        })
    }

    fn request_parts(result: &SigningResult, authorization: &str) -> http::request::Parts {
        let (parts, ()) = http::Request::builder()
            .method("POST")
            .uri(format!("https://{HOST}/?{QUERY}"))
            .header("content-type", CONTENT_TYPE_JSON)
            .header("host", HOST)
            .header("x-content-sha256", &result.content_hash)
            .header("x-date", &result.iso_timestamp)
            .header(http::header::AUTHORIZATION, authorization)
            .body(())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_should_parse_authorization_header() {
        let parsed = parse_authorization_header(&signed().authorization_header).unwrap();
        assert_eq!(parsed.access_key_id, ACCESS_KEY);
        assert_eq!(parsed.date, "20240510");
        assert_eq!(parsed.region, "cn-north-1");
        assert_eq!(parsed.service, "cv");
        assert_eq!(
            parsed.signed_headers,
            vec!["content-type", "host", "x-content-sha256", "x-date"]
        );
        assert_eq!(parsed.signature.len(), 64);
    }

    #[test]
    fn test_should_reject_unsupported_algorithm() {
        let header = "AWS4-HMAC-SHA256 Credential=AK/20240510/cn-north-1/cv/aws4_request,\
            SignedHeaders=host,Signature=abc";
        assert!(matches!(
            parse_authorization_header(header),
            Err(AuthError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn test_should_reject_invalid_credential_scope() {
        let header = "HMAC-SHA256 Credential=AK/20240510/cn-north-1/cv/aws4_request,\
            SignedHeaders=host,Signature=abc";
        assert!(matches!(
            parse_authorization_header(header),
            Err(AuthError::InvalidCredential)
        ));
    }

    #[test]
    fn test_should_verify_signed_request() {
        let result = signed();
        let parts = request_parts(&result, &result.authorization_header);

        let auth = verify_request(&parts, BODY, &provider()).unwrap();
        assert_eq!(auth.access_key_id, ACCESS_KEY);
        assert_eq!(auth.region, "cn-north-1");
        assert_eq!(auth.service, "cv");
    }

    #[test]
    fn test_should_reject_tampered_body() {
        let result = signed();
        let parts = request_parts(&result, &result.authorization_header);

        let verdict = verify_request(&parts, b"{\"prompt\":\"something else\"}", &provider());
        assert!(matches!(verdict, Err(AuthError::ContentHashMismatch)));
    }

    #[test]
    fn test_should_reject_wrong_secret() {
        let result = signed();
        let parts = request_parts(&result, &result.authorization_header);
        let provider =
            StaticCredentialProvider::new(vec![(ACCESS_KEY.to_owned(), "wrong".to_owned())]);

        let verdict = verify_request(&parts, BODY, &provider);
        assert!(matches!(verdict, Err(AuthError::SignatureDoesNotMatch)));
    }

    #[test]
    fn test_should_reject_mismatched_scope_date() {
        let result = signed();
        let forged = result
            .authorization_header
            .replace("/20240510/", "/20240511/");
        let parts = request_parts(&result, &forged);

        let verdict = verify_request(&parts, BODY, &provider());
        assert!(matches!(verdict, Err(AuthError::DateMismatch { .. })));
    }

    #[test]
    fn test_should_fail_with_missing_auth_header() {
        let (parts, ()) = http::Request::builder()
            .method("POST")
            .uri("https://example.com/")
            .body(())
            .unwrap()
            .into_parts();

        let verdict = verify_request(&parts, b"", &provider());
        assert!(matches!(verdict, Err(AuthError::MissingAuthHeader)));
    }

    #[test]
    fn test_should_fail_with_unknown_access_key() {
        let result = signed();
        let parts = request_parts(&result, &result.authorization_header);

        let verdict = verify_request(&parts, BODY, &StaticCredentialProvider::new(vec![]));
        assert!(matches!(verdict, Err(AuthError::AccessKeyNotFound(_))));
    }
}
