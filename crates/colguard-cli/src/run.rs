use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use colguard_core::{DynamicRecord, MessageArg, Mode, ValidationError, ViolationKind};
use colguard_engine::{EntityValidator, MetadataResolver};

use crate::CliError;

/// Result line printed for one input record.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub index: usize,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ViolationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<MessageArg>,
    pub checked_at: DateTime<Utc>,
}

impl RecordOutcome {
    fn passed(index: usize) -> Self {
        Self {
            index,
            ok: true,
            field: None,
            kind: None,
            message: None,
            template: None,
            args: Vec::new(),
            checked_at: Utc::now(),
        }
    }

    fn failed(index: usize, err: &ValidationError) -> Self {
        Self {
            index,
            ok: false,
            field: Some(err.field().to_string()),
            kind: Some(err.kind()),
            message: Some(err.message()),
            template: Some(err.template().to_string()),
            args: err.args().to_vec(),
            checked_at: Utc::now(),
        }
    }
}

/// Totals of one validation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn is_ok(&self) -> bool {
        self.failed == 0
    }
}

/// Read a JSON file holding one object or an array of objects.
pub fn load_records(path: &Path, entity: &str) -> Result<Vec<DynamicRecord>, CliError> {
    let content = std::fs::read_to_string(path).map_err(|err| CliError::Records(format!(
        "cannot read {}: {err}",
        path.display()
    )))?;
    let document: serde_json::Value = serde_json::from_str(&content)?;
    parse_records(&document, entity)
}

pub fn parse_records(
    document: &serde_json::Value,
    entity: &str,
) -> Result<Vec<DynamicRecord>, CliError> {
    let items = match document {
        serde_json::Value::Array(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            DynamicRecord::from_json(entity, item).ok_or_else(|| {
                CliError::Records(format!("record {index} is not a JSON object"))
            })
        })
        .collect()
}

/// Validate every record, writing one JSON line per record to `out`.
///
/// A record that fails validation is reported and the run goes on; a
/// configuration error stops the run.
pub fn validate_records<W: Write>(
    resolver: &MetadataResolver,
    records: Vec<DynamicRecord>,
    mode: Mode,
    out: &mut W,
) -> Result<RunSummary, CliError> {
    let mut summary = RunSummary::default();
    for (index, record) in records.into_iter().enumerate() {
        let validator = EntityValidator::new(Arc::new(record), resolver)?;
        let outcome = match validator.validate(mode) {
            Ok(()) => RecordOutcome::passed(index),
            Err(err) => {
                summary.failed += 1;
                RecordOutcome::failed(index, &err)
            }
        };
        summary.total += 1;

        tracing::info!(
            event = "record_validated",
            index = index,
            ok = outcome.ok,
            field = outcome.field.as_deref().unwrap_or_default()
        );
        serde_json::to_writer(&mut *out, &outcome)?;
        out.write_all(b"\n")?;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use colguard_engine::ResolverOptions;
    use colguard_schema::SchemaDocument;

    use super::*;

    fn resolver() -> MetadataResolver {
        let document: SchemaDocument = serde_json::from_value(json!({
            "entities": [{
                "name": "Product",
                "fields": [
                    { "name": "id", "column": { "type": "integer", "id": true } },
                    { "name": "barcode", "column": { "type": "string", "length": 10, "fixed": true } },
                    { "name": "price", "column": { "type": "decimal", "precision": 10, "scale": 2, "unsigned": true } }
                ]
            }]
        }))
        .unwrap();
        MetadataResolver::new(document.to_registry().unwrap(), ResolverOptions::cached())
    }

    fn lines(out: Vec<u8>) -> Vec<serde_json::Value> {
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn accepts_an_object_or_an_array() {
        let single = parse_records(&json!({ "barcode": "0123456789" }), "Product").unwrap();
        assert_eq!(single.len(), 1);
        let many = parse_records(&json!([{}, {}]), "Product").unwrap();
        assert_eq!(many.len(), 2);
        let err = parse_records(&json!([{}, 3]), "Product").unwrap_err();
        assert_eq!(err.to_string(), "invalid records: record 1 is not a JSON object");
    }

    #[test]
    fn reports_every_record() {
        let records = parse_records(
            &json!([
                { "barcode": "0123456789", "price": 10.5 },
                { "barcode": "123", "price": 10.5 },
                { "barcode": "0123456789", "price": -1 }
            ]),
            "Product",
        )
        .unwrap();
        let mut out = Vec::new();
        let summary = validate_records(&resolver(), records, Mode::Insert, &mut out).unwrap();
        assert_eq!(summary, RunSummary { total: 3, failed: 2 });
        assert!(!summary.is_ok());

        let lines = lines(out);
        assert_eq!(lines[0]["ok"], json!(true));
        assert!(lines[0].get("field").is_none());
        assert_eq!(lines[1]["field"], json!("barcode"));
        assert_eq!(lines[1]["kind"], json!("wrong_length"));
        assert_eq!(lines[1]["args"], json!(["barcode", 10]));
        assert_eq!(
            lines[1]["message"],
            json!("barcode has wrong length (must be 10 characters)")
        );
        assert_eq!(lines[2]["kind"], json!("negative"));
        assert!(lines[2]["checked_at"].is_string());
    }

    #[test]
    fn unknown_entity_stops_the_run() {
        let records = parse_records(&json!({}), "Ghost").unwrap();
        let mut out = Vec::new();
        let err = validate_records(&resolver(), records, Mode::Insert, &mut out).unwrap_err();
        assert_eq!(err.to_string(), "core error: Ghost is not a persisted entity");
        assert!(out.is_empty());
    }
}
