use chrono::{DateTime, Utc};

use crate::codec::{FieldReader, RecordCodec};
use crate::core::{RawRecord, RecordId};

/// A logged run: distance in miles, pace in minutes per mile.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    id: Option<RecordId>,
    pub name: String,
    pub distance_miles: f64,
    pub pace_min_per_mile: f64,
    pub description: String,
    pub date: DateTime<Utc>,
}

impl Run {
    pub fn new(name: impl Into<String>, distance_miles: f64, pace_min_per_mile: f64, date: DateTime<Utc>) -> Self {
        Self {
            id: None,
            name: name.into(),
            distance_miles,
            pace_min_per_mile,
            description: String::new(),
            date,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    /// Total duration in minutes.
    pub fn duration_minutes(&self) -> f64 {
        self.distance_miles * self.pace_min_per_mile
    }
}

impl RecordCodec for Run {
    const RECORD_TYPE: &'static str = "Runs";

    fn record_id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }

    fn with_record_id(mut self, id: RecordId) -> Self {
        self.id = Some(id);
        self
    }

    fn encode(&self) -> RawRecord {
        let mut record = self.blank_record();
        record.set("name", self.name.as_str());
        record.set("distance", self.distance_miles);
        record.set("pace", self.pace_min_per_mile);
        record.set("description", self.description.as_str());
        record.set("date", self.date);
        record
    }

    fn decode(record: &RawRecord) -> Option<Self> {
        let fields = FieldReader::for_type(record, Self::RECORD_TYPE)?;
        Some(Self {
            id: fields.id(),
            name: fields.text("name")?,
            distance_miles: fields.float("distance")?,
            pace_min_per_mile: fields.float("pace")?,
            description: fields.optional_text("description")?.unwrap_or_default(),
            date: fields.timestamp("date")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn morning_run() -> Run {
        let date = Utc.with_ymd_and_hms(2024, 4, 23, 7, 30, 0).unwrap();
        Run::new("Lakeside loop", 5.0, 8.5, date).description("easy pace")
    }

    #[test]
    fn test_round_trip() {
        let run = morning_run().with_record_id(RecordId::new("r7"));
        assert_eq!(Run::decode(&run.encode()), Some(run));
    }

    #[test]
    fn test_integer_distance_widens() {
        let mut record = morning_run().encode();
        record.set("distance", 3i64);

        let run = Run::decode(&record).unwrap();
        assert_eq!(run.distance_miles, 3.0);
    }

    #[test]
    fn test_each_required_field_is_enforced() {
        for key in ["name", "distance", "pace", "date"] {
            let mut record = morning_run().encode();
            record.remove(key);
            assert_eq!(Run::decode(&record), None, "decode should fail without '{}'", key);
        }
    }

    #[test]
    fn test_missing_description_defaults_to_empty() {
        let mut record = morning_run().encode();
        record.remove("description");

        assert_eq!(Run::decode(&record).unwrap().description, "");
    }

    #[test]
    fn test_duration() {
        assert_eq!(morning_run().duration_minutes(), 42.5);
    }
}
