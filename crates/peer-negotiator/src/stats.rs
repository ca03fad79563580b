//! Normalization of connection statistics.
//!
//! Peer connection implementations report statistics in one of two shapes:
//! the standard shape, where each report is a map of fields that may carry a
//! nested `values` array, and the legacy shape, a list of named stat entries.
//! Both are flattened into [`StatsReport`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq)]
pub enum RawStatsReport {
    Standard {
        id: String,
        kind: String,
        timestamp: f64,
        fields: Map<String, Value>,
    },
    Legacy {
        id: String,
        kind: String,
        timestamp: f64,
        /// `(name, stat(name))` pairs in the order `names()` lists them.
        entries: Vec<(String, Value)>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsReport {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: f64,
    pub fields: BTreeMap<String, Value>,
}

impl StatsReport {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

impl From<RawStatsReport> for StatsReport {
    fn from(raw: RawStatsReport) -> Self {
        match raw {
            RawStatsReport::Standard {
                id,
                kind,
                timestamp,
                mut fields,
            } => {
                let nested = fields.remove("values");
                let mut flat: BTreeMap<String, Value> = fields.into_iter().collect();
                if let Some(Value::Array(values)) = nested {
                    for value in values {
                        if let Value::Object(entries) = value {
                            flat.extend(entries);
                        }
                    }
                } else if let Some(other) = nested {
                    flat.insert("values".to_string(), other);
                }
                StatsReport {
                    id,
                    kind,
                    timestamp,
                    fields: flat,
                }
            }
            RawStatsReport::Legacy {
                id,
                kind,
                timestamp,
                entries,
            } => StatsReport {
                id,
                kind,
                timestamp,
                fields: entries.into_iter().collect(),
            },
        }
    }
}

pub fn normalize(reports: Vec<RawStatsReport>) -> Vec<StatsReport> {
    reports.into_iter().map(StatsReport::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn nested_values_are_merged_into_top_level() {
        let raw = RawStatsReport::Standard {
            id: "RTCTransport_0".into(),
            kind: "transport".into(),
            timestamp: 1.5,
            fields: object(json!({
                "bytesSent": 10,
                "values": [{"packetsSent": 2}, {"bytesSent": 12, "rtt": 0.02}]
            })),
        };
        let report = StatsReport::from(raw);
        assert_eq!(report.get("packetsSent"), Some(&json!(2)));
        assert_eq!(report.get("bytesSent"), Some(&json!(12)));
        assert_eq!(report.get("rtt"), Some(&json!(0.02)));
        assert!(report.get("values").is_none());
    }

    #[test]
    fn non_array_values_field_is_kept() {
        let raw = RawStatsReport::Standard {
            id: "x".into(),
            kind: "codec".into(),
            timestamp: 0.0,
            fields: object(json!({"values": "opaque"})),
        };
        assert_eq!(StatsReport::from(raw).get("values"), Some(&json!("opaque")));
    }

    #[test]
    fn legacy_reports_become_flat_fields() {
        let reports = normalize(vec![RawStatsReport::Legacy {
            id: "ssrc_1234_send".into(),
            kind: "ssrc".into(),
            timestamp: 42.0,
            entries: vec![
                ("packetsSent".into(), json!("17")),
                ("googRtt".into(), json!("3")),
            ],
        }]);
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].kind, "ssrc");
        assert_eq!(reports[0].get("googRtt"), Some(&json!("3")));
        let encoded = serde_json::to_value(&reports[0]).unwrap();
        assert_eq!(encoded["type"], json!("ssrc"));
    }
}
