//! Arrow schema for the joined calls table.

use arrow::datatypes::{DataType, Field, Schema, SchemaRef, TimeUnit};
use std::sync::Arc;

/// Column names, in schema order.
pub mod column {
    pub const ID: &str = "id";
    pub const AGENT_ID: &str = "agent_id";
    pub const CUSTOMER_REGION: &str = "customer_region";
    pub const ISSUE_TYPE: &str = "issue_type";
    pub const DURATION_SECONDS: &str = "duration_seconds";
    pub const RESOLUTION_STATUS: &str = "resolution_status";
    pub const STARTED_AT: &str = "started_at";
    pub const RATING: &str = "rating";
    pub const AGENT_NAME: &str = "agent_name";
    pub const AGENT_TEAM: &str = "agent_team";
    pub const AGENT_REGION: &str = "agent_region";
}

/// Timezone tag stored on the `started_at` column.
pub const TIMEZONE: &str = "UTC";

pub fn started_at_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some(TIMEZONE.into()))
}

/// Schema for the calls artifact: call fields, then null-fillable agent fields.
pub fn calls_schema() -> SchemaRef {
    Arc::new(Schema::new(vec![
        Field::new(column::ID, DataType::Utf8, false),
        Field::new(column::AGENT_ID, DataType::Utf8, false),
        Field::new(column::CUSTOMER_REGION, DataType::Utf8, false),
        Field::new(column::ISSUE_TYPE, DataType::Utf8, false),
        Field::new(column::DURATION_SECONDS, DataType::UInt64, false),
        Field::new(column::RESOLUTION_STATUS, DataType::Utf8, false),
        Field::new(column::STARTED_AT, started_at_type(), false),
        Field::new(column::RATING, DataType::Float64, true),
        Field::new(column::AGENT_NAME, DataType::Utf8, true),
        Field::new(column::AGENT_TEAM, DataType::Utf8, true),
        Field::new(column::AGENT_REGION, DataType::Utf8, true),
    ]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_fields_are_required_agent_fields_nullable() {
        let schema = calls_schema();
        for name in [column::ID, column::AGENT_ID, column::DURATION_SECONDS] {
            assert!(!schema.field_with_name(name).unwrap().is_nullable());
        }
        for name in [column::RATING, column::AGENT_NAME, column::AGENT_TEAM] {
            assert!(schema.field_with_name(name).unwrap().is_nullable());
        }
        assert_eq!(schema.fields().len(), 11);
    }
}
