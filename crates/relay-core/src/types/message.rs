//! Outbound message announcing a loadable object

use serde::{Deserialize, Serialize};

use crate::matcher::PathMatch;
use crate::{Error, Result};

/// Message published for every object that matches the path pattern.
///
/// Field order is part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub bucket: String,
    pub file_name: String,
    pub dataset_name: String,
    pub table_name: String,
}

impl OutboundMessage {
    pub const CSV: &'static str = "csv";

    /// Build the message for a matched CSV object
    pub fn csv(bucket: &str, file_name: &str, path_match: &PathMatch) -> Self {
        Self {
            kind: Self::CSV.to_string(),
            bucket: bucket.to_string(),
            file_name: file_name.to_string(),
            dataset_name: path_match.dataset_name.clone(),
            table_name: path_match.table_name.clone(),
        }
    }

    /// UTF-8 JSON encoding handed to the publisher
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| Error::Publish(format!("Failed to serialize message: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let path_match = PathMatch {
            dataset_name: "uaf_acep_solar".into(),
            table_name: "uaf_acep_solar".into(),
        };
        let message = OutboundMessage::csv(
            "acep-drop",
            "2024/05/uaf-acep-solar/uaf-acep-solar_2024-05-01.csv",
            &path_match,
        );

        let bytes = message.to_bytes().unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"type":"csv","bucket":"acep-drop","file_name":"2024/05/uaf-acep-solar/uaf-acep-solar_2024-05-01.csv","dataset_name":"uaf_acep_solar","table_name":"uaf_acep_solar"}"#
        );
    }
}
