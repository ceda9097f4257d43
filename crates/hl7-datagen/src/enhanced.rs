use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::ValueSource;
use crate::context::{FieldSlot, GenContext, Value};
use crate::error::ProviderError;
use crate::fallback::FallbackSource;

/// Where and how to reach the external content source. The endpoint is an
/// opaque JSON-over-HTTP service; provider-specific authentication lives
/// outside this crate.
#[derive(Debug, Clone)]
pub struct EnhancedConfig {
    pub endpoint: Option<String>,
    pub timeout: Duration,
}

impl Default for EnhancedConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Serialize)]
struct SlotRequest<'a> {
    path: String,
    name: &'a str,
    data_type: &'a str,
    table: Option<&'a str>,
    message_type: &'a str,
    facility: &'a str,
}

#[derive(Debug, Deserialize)]
struct SlotResponse {
    value: String,
}

/// Asks the configured endpoint for a slot value. Every failure mode
/// (missing configuration, connect error, timeout, bad status, malformed
/// body, table violation) surfaces as a [`ProviderError`] for the
/// composing source to absorb.
pub struct EnhancedSource {
    config: EnhancedConfig,
    client: reqwest::blocking::Client,
}

impl EnhancedSource {
    pub fn new(config: EnhancedConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_default();
        Self { config, client }
    }
}

impl ValueSource for EnhancedSource {
    fn provide(&self, slot: &FieldSlot<'_>, ctx: &GenContext) -> Result<Value, ProviderError> {
        let endpoint = self
            .config
            .endpoint
            .as_deref()
            .ok_or(ProviderError::NotConfigured)?;

        let request = SlotRequest {
            path: slot.path.to_string(),
            name: slot.name,
            data_type: &slot.data_type.name,
            table: slot.table.map(|t| t.id.as_str()),
            message_type: &ctx.message_type,
            facility: &ctx.facility,
        };

        let response = self.client.post(endpoint).json(&request).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Status(status.as_u16()));
        }
        let body: SlotResponse = response
            .json()
            .map_err(|e| ProviderError::Malformed(e.to_string()))?;

        let value = body.value.trim().to_string();
        if value.is_empty() {
            return Err(ProviderError::Malformed("empty value".to_string()));
        }
        if let Some(table) = slot.table {
            if !table.contains(&value) {
                return Err(ProviderError::ConstraintViolation {
                    value,
                    table: table.id.clone(),
                });
            }
        }
        Ok(Value(value))
    }
}

/// Try the enhanced source, fall back on any failure. The failure is logged
/// and the slot is filled from the curated datasets; generation never sees
/// the degradation.
pub struct EnhancedWithFallback {
    enhanced: EnhancedSource,
    fallback: FallbackSource,
}

impl EnhancedWithFallback {
    pub fn new(config: EnhancedConfig) -> Self {
        Self {
            enhanced: EnhancedSource::new(config),
            fallback: FallbackSource::new(),
        }
    }
}

impl ValueSource for EnhancedWithFallback {
    fn provide(&self, slot: &FieldSlot<'_>, ctx: &GenContext) -> Result<Value, ProviderError> {
        match self.enhanced.provide(slot, ctx) {
            Ok(value) => Ok(value),
            Err(ProviderError::NotConfigured) => {
                debug!(path = %slot.path, "no enhancement endpoint, using fallback");
                self.fallback.provide(slot, ctx)
            }
            Err(error) => {
                warn!(path = %slot.path, %error, "enhancement degraded to fallback");
                self.fallback.provide(slot, ctx)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use hl7_model::FieldPath;
    use hl7_model::definition::{DataTypeDefinition, DataTypeKind};

    use super::*;

    #[test]
    fn unreachable_endpoint_degrades_to_fallback() {
        let config = EnhancedConfig {
            // Reserved TEST-NET address; nothing listens here.
            endpoint: Some("http://192.0.2.1:1/values".to_string()),
            timeout: Duration::from_millis(50),
        };
        let source = EnhancedWithFallback::new(config);
        let path = FieldPath::field("PID", 19);
        let data_type = DataTypeDefinition {
            name: "ST".to_string(),
            kind: DataTypeKind::Text,
            description: None,
            components: Vec::new(),
        };
        let slot = FieldSlot {
            path: &path,
            name: "SSN Number - Patient",
            data_type: &data_type,
            table: None,
            phi: Some(hl7_model::PhiCategory::Identifier),
            segment_occurrence: 0,
            repetition: 0,
        };
        let now = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let ctx = GenContext::new("ADT^A01", "DEMO_HOSPITAL", 7, now);

        let value = source
            .provide(&slot, &ctx)
            .expect("degradation must not surface");
        assert!(!value.as_str().is_empty());
    }

    #[test]
    fn missing_endpoint_uses_fallback_silently() {
        let source = EnhancedWithFallback::new(EnhancedConfig::default());
        let path = FieldPath::component("PID", 5, 1);
        let data_type = DataTypeDefinition {
            name: "ST".to_string(),
            kind: DataTypeKind::Text,
            description: None,
            components: Vec::new(),
        };
        let slot = FieldSlot {
            path: &path,
            name: "Family Name",
            data_type: &data_type,
            table: None,
            phi: Some(hl7_model::PhiCategory::Name),
            segment_occurrence: 0,
            repetition: 0,
        };
        let now = NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let ctx = GenContext::new("ADT^A01", "DEMO_HOSPITAL", 7, now);
        assert!(source.provide(&slot, &ctx).is_ok());
    }
}
