//! Warning acknowledgment tokens
//!
//! A warning-only result cannot be saved until the caller echoes back a
//! token proving they saw those warnings for that exact data. Tokens are
//! stateless: `{expiry}.{content hash}.{signature}`, where the hash binds
//! entity, record and warning codes, and the signature is an HMAC over
//! `{expiry}.{hash}`. Both segments are truncated to 16 hex characters.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt;

use tenet_core::{ConfigError, ConfigResult, EngineConfig, Record, ValidationIssue, Value};

use crate::error::{AcknowledgmentError, AcknowledgmentResult};

type HmacSha256 = Hmac<Sha256>;

/// Hex characters kept from the hash and the signature.
const SEGMENT_LEN: usize = 16;

/// Issues and verifies acknowledgment tokens.
#[derive(Clone)]
pub struct WarningAcknowledgmentService {
    mac: HmacSha256,
    ttl_seconds: i64,
}

impl WarningAcknowledgmentService {
    pub fn new(secret: &str, ttl_seconds: i64) -> ConfigResult<Self> {
        if secret.is_empty() {
            return Err(ConfigError::MissingRequired {
                field: "acknowledgment.secret".to_string(),
            });
        }
        if ttl_seconds <= 0 {
            return Err(ConfigError::InvalidValue {
                field: "acknowledgment.ttl_seconds".to_string(),
                value: ttl_seconds.to_string(),
                reason: "must be positive".to_string(),
            });
        }
        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "acknowledgment.secret".to_string(),
                value: String::new(),
                reason: e.to_string(),
            }
        })?;
        Ok(Self { mac, ttl_seconds })
    }

    pub fn from_config(config: &EngineConfig) -> ConfigResult<Self> {
        Self::new(config.require_secret()?, config.acknowledgment.ttl_seconds)
    }

    pub fn ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Issue a token for `warnings` on `record`, valid from now.
    pub fn generate_token(&self, entity: &str, record: &Record, warnings: &[ValidationIssue]) -> String {
        self.generate_token_at(entity, record, warnings, Utc::now())
    }

    pub fn generate_token_at(
        &self,
        entity: &str,
        record: &Record,
        warnings: &[ValidationIssue],
        now: DateTime<Utc>,
    ) -> String {
        let expires_at = now.timestamp() + self.ttl_seconds;
        let hash = content_hash(entity, record, warnings);
        let payload = format!("{}.{}", expires_at, hash);
        let signature = self.sign(&payload);
        format!("{}.{}", payload, signature)
    }

    /// Check a token against the current record and warnings.
    pub fn verify_token(
        &self,
        token: &str,
        entity: &str,
        record: &Record,
        warnings: &[ValidationIssue],
    ) -> AcknowledgmentResult<()> {
        self.verify_token_at(token, entity, record, warnings, Utc::now())
    }

    pub fn verify_token_at(
        &self,
        token: &str,
        entity: &str,
        record: &Record,
        warnings: &[ValidationIssue],
        now: DateTime<Utc>,
    ) -> AcknowledgmentResult<()> {
        let result = self.check(token, entity, record, warnings, now);
        if let Err(e) = &result {
            tracing::warn!(
                entity = %entity,
                code = e.code(),
                error = %e,
                "Acknowledgment token rejected"
            );
        }
        result
    }

    fn check(
        &self,
        token: &str,
        entity: &str,
        record: &Record,
        warnings: &[ValidationIssue],
        now: DateTime<Utc>,
    ) -> AcknowledgmentResult<()> {
        let parts: Vec<&str> = token.split('.').collect();
        let [expiry, hash, signature] = parts.as_slice() else {
            return Err(AcknowledgmentError::invalid("malformed token"));
        };
        let expires_at: i64 = expiry
            .parse()
            .map_err(|_| AcknowledgmentError::invalid("malformed expiry"))?;

        if expires_at < now.timestamp() {
            return Err(AcknowledgmentError::Expired);
        }

        if signature.len() != SEGMENT_LEN || !is_lower_hex(signature) {
            return Err(AcknowledgmentError::invalid("malformed signature"));
        }
        let tag = hex::decode(signature)
            .map_err(|_| AcknowledgmentError::invalid("malformed signature"))?;
        let mut mac = self.mac.clone();
        mac.update(expiry.as_bytes());
        mac.update(b".");
        mac.update(hash.as_bytes());
        mac.verify_truncated_left(&tag)
            .map_err(|_| AcknowledgmentError::invalid("signature mismatch"))?;

        if *hash != content_hash(entity, record, warnings) {
            return Err(AcknowledgmentError::DataChanged);
        }
        Ok(())
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let mut signature = hex::encode(mac.finalize().into_bytes());
        signature.truncate(SEGMENT_LEN);
        signature
    }
}

impl fmt::Debug for WarningAcknowledgmentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarningAcknowledgmentService")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

/// Truncated SHA-256 of `{entity}:{record json}:{sorted warning codes json}`.
///
/// Object keys serialize in sorted order, so equal records hash equally
/// whatever order their fields arrived in.
fn content_hash(entity: &str, record: &Record, warnings: &[ValidationIssue]) -> String {
    let record_json = serde_json::Value::from(&Value::Object(record.clone()));
    let mut codes: Vec<String> = warnings.iter().map(|w| w.code.clone()).collect();
    codes.sort();
    let codes_json = serde_json::Value::from(codes);

    let content = format!("{}:{}:{}", entity, record_json, codes_json);
    let mut hash = hex::encode(Sha256::digest(content.as_bytes()));
    hash.truncate(SEGMENT_LEN);
    hash
}

fn is_lower_hex(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use tenet_test_utils::record;

    fn service() -> WarningAcknowledgmentService {
        WarningAcknowledgmentService::new("test-secret", 300).unwrap()
    }

    fn warnings() -> Vec<ValidationIssue> {
        vec![ValidationIssue::warning("Large discount", "LARGE_DISCOUNT")]
    }

    #[test]
    fn test_token_shape() {
        let token = service().generate_token("order", &record(json!({"discount": 40})), &warnings());
        let parts: Vec<&str> = token.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[0].parse::<i64>().is_ok());
        assert_eq!(parts[1].len(), 16);
        assert_eq!(parts[2].len(), 16);
        assert!(is_lower_hex(parts[1]) && is_lower_hex(parts[2]));
    }

    #[test]
    fn test_hash_ignores_field_order_but_not_values() {
        let a = record(json!({"a": 1, "b": "x"}));
        let mut b = Record::new();
        b.insert("b".to_string(), Value::from("x"));
        b.insert("a".to_string(), Value::from(1));
        assert_eq!(content_hash("e", &a, &warnings()), content_hash("e", &b, &warnings()));

        let c = record(json!({"a": 2, "b": "x"}));
        assert_ne!(content_hash("e", &a, &warnings()), content_hash("e", &c, &warnings()));
        assert_ne!(content_hash("e", &a, &warnings()), content_hash("f", &a, &warnings()));
        assert_ne!(content_hash("e", &a, &warnings()), content_hash("e", &a, &[]));
    }

    #[test]
    fn test_rejections() {
        let svc = service();
        let rec = record(json!({"discount": 40}));
        let now = Utc::now();
        let token = svc.generate_token_at("order", &rec, &warnings(), now);

        assert_eq!(svc.verify_token_at(&token, "order", &rec, &warnings(), now), Ok(()));

        let expired = svc.verify_token_at(&token, "order", &rec, &warnings(), now + Duration::seconds(301));
        assert_eq!(expired, Err(AcknowledgmentError::Expired));

        for bad in ["", "a.b", "x.0123456789abcdef.0123456789abcdef", "1.2.3.4"] {
            assert!(matches!(
                svc.verify_token_at(bad, "order", &rec, &warnings(), now),
                Err(AcknowledgmentError::Invalid { .. })
            ));
        }

        let upper = token.to_uppercase();
        assert!(matches!(
            svc.verify_token_at(&upper, "order", &rec, &warnings(), now),
            Err(AcknowledgmentError::Invalid { .. })
        ));
    }

    #[test]
    fn test_other_secret_rejects() {
        let rec = record(json!({"discount": 40}));
        let token = service().generate_token("order", &rec, &warnings());
        let other = WarningAcknowledgmentService::new("other-secret", 300).unwrap();
        assert!(matches!(
            other.verify_token(&token, "order", &rec, &warnings()),
            Err(AcknowledgmentError::Invalid { .. })
        ));
    }

    #[test]
    fn test_construction_checks() {
        assert!(matches!(
            WarningAcknowledgmentService::new("", 300),
            Err(ConfigError::MissingRequired { .. })
        ));
        assert!(matches!(
            WarningAcknowledgmentService::new("s", 0),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            WarningAcknowledgmentService::from_config(&EngineConfig::default()),
            Err(ConfigError::MissingRequired { .. })
        ));
    }
}
