use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::document::SchemaDocument;

/// Emit the JSON Schema for schema documents.
pub fn document_json_schema() -> RootSchema {
    schema_for!(SchemaDocument)
}
