//! Storage notification types
//!
//! Object-creation notifications reach the relay in one of three shapes:
//! - CloudEvents binary mode (`ce-*` headers, object resource as body)
//! - CloudEvents structured mode (`{type, time, id, data}`)
//! - Background function envelope (`{data, context}`)

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::utils::format_rfc3339;
use crate::{Error, Result};

/// Event type reported when the notification does not name one
pub const UNKNOWN_EVENT_TYPE: &str = "unknown";

/// Object resource carried in a storage notification
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageObjectData {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub time_created: Option<String>,
}

/// Invocation context of a background function event
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventContext {
    #[serde(default, alias = "event_id")]
    pub event_id: Option<String>,
    #[serde(default, alias = "event_type")]
    pub event_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// CloudEvents attributes delivered as `ce-*` headers
#[derive(Debug, Clone, Default)]
pub struct CloudEventAttributes {
    pub id: Option<String>,
    pub event_type: Option<String>,
    pub time: Option<String>,
}

impl CloudEventAttributes {
    /// Binary-mode events always carry a type
    pub fn is_present(&self) -> bool {
        self.event_type.is_some()
    }
}

/// A newly created storage object, as seen by one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageEvent {
    pub bucket: String,
    pub object_path: String,
    pub event_type: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
}

impl StorageEvent {
    pub fn new(
        bucket: impl Into<String>,
        object_path: impl Into<String>,
        event_type: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            object_path: object_path.into(),
            event_type: event_type.into(),
            timestamp: timestamp.into(),
            event_id: None,
        }
    }

    /// Assemble an event from an object resource and its metadata
    pub fn from_parts(
        data: StorageObjectData,
        event_type: Option<String>,
        timestamp: Option<String>,
        event_id: Option<String>,
    ) -> Result<Self> {
        let object_path = data
            .name
            .ok_or_else(|| Error::InvalidEvent("missing object name".into()))?;
        let bucket = data
            .bucket
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::InvalidEvent("missing bucket name".into()))?;

        let timestamp = timestamp
            .or(data.time_created)
            .unwrap_or_else(|| format_rfc3339(&Utc::now()));

        let event_type = event_type.unwrap_or_else(|| UNKNOWN_EVENT_TYPE.to_string());
        let mut event = Self::new(bucket, object_path, event_type, timestamp);
        event.event_id = event_id;
        Ok(event)
    }

    /// Parse a binary-mode CloudEvent body
    pub fn from_cloud_event(attributes: &CloudEventAttributes, body: &[u8]) -> Result<Self> {
        let data: StorageObjectData = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidEvent(format!("malformed object resource: {}", e)))?;

        Self::from_parts(
            data,
            attributes.event_type.clone(),
            attributes.time.clone(),
            attributes.id.clone(),
        )
    }

    /// Parse a structured CloudEvent, a background function envelope, or a
    /// bare object resource
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| Error::InvalidEvent(format!("malformed event body: {}", e)))?;

        let Some(fields) = value.as_object() else {
            return Err(Error::InvalidEvent(
                "event body must be a JSON object".into(),
            ));
        };

        let Some(data) = fields.get("data") else {
            let data: StorageObjectData = serde_json::from_value(value.clone())
                .map_err(|e| Error::InvalidEvent(format!("malformed object resource: {}", e)))?;
            return Self::from_parts(data, None, None, None);
        };

        let data: StorageObjectData = serde_json::from_value(data.clone())
            .map_err(|e| Error::InvalidEvent(format!("malformed event data: {}", e)))?;

        if let Some(context) = fields.get("context") {
            let context: EventContext = serde_json::from_value(context.clone())
                .map_err(|e| Error::InvalidEvent(format!("malformed event context: {}", e)))?;
            return Self::from_parts(data, context.event_type, context.timestamp, context.event_id);
        }

        let attribute = |key: &str| fields.get(key).and_then(Value::as_str).map(str::to_string);
        Self::from_parts(data, attribute("type"), attribute("time"), attribute("id"))
    }
}
