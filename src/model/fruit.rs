use crate::codec::{FieldReader, RecordCodec};
use crate::core::{AssetRef, RawRecord, RecordId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fruit {
    id: Option<RecordId>,
    pub name: String,
    pub count: i64,
    pub image: Option<AssetRef>,
}

impl Fruit {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            count: 0,
            image: None,
        }
    }

    pub fn count(mut self, count: i64) -> Self {
        self.count = count;
        self
    }

    pub fn image(mut self, image: AssetRef) -> Self {
        self.image = Some(image);
        self
    }

    pub fn id(&self) -> Option<&RecordId> {
        self.id.as_ref()
    }
}

impl RecordCodec for Fruit {
    const RECORD_TYPE: &'static str = "Fruits";

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
        record.set("count", self.count);
        record.set("image", self.image.clone());
        record
    }

    fn decode(record: &RawRecord) -> Option<Self> {
        let fields = FieldReader::for_type(record, Self::RECORD_TYPE)?;
        Some(Self {
            id: fields.id(),
            name: fields.text("name")?,
            count: fields.integer_or("count", 0)?,
            image: fields.optional_asset("image")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::FieldValue;

    #[test]
    fn test_round_trip_with_identity() {
        let fruit = Fruit::new("Banana")
            .count(4)
            .image(AssetRef::new("file:///tmp/IMG_1811.jpg"))
            .with_record_id(RecordId::new("r1"));

        assert_eq!(Fruit::decode(&fruit.encode()), Some(fruit));
    }

    #[test]
    fn test_round_trip_without_identity() {
        let fruit = Fruit::new("Kiwi");
        let record = fruit.encode();

        assert!(record.id().is_none());
        assert_eq!(Fruit::decode(&record), Some(fruit));
    }

    #[test]
    fn test_missing_count_defaults_to_zero() {
        let mut record = RawRecord::new("Fruits");
        record.set("name", "Banana");

        let fruit = Fruit::decode(&record).unwrap();
        assert_eq!(fruit.count, 0);
        assert_eq!(fruit.image, None);
    }

    #[test]
    fn test_missing_or_mistyped_name_fails() {
        let mut record = RawRecord::new("Fruits");
        record.set("count", 1i64);
        assert_eq!(Fruit::decode(&record), None);

        record.set("name", 12i64);
        assert_eq!(Fruit::decode(&record), None);

        record.set("name", FieldValue::Null);
        assert_eq!(Fruit::decode(&record), None);
    }

    #[test]
    fn test_mistyped_optional_fields_fail() {
        let mut record = RawRecord::new("Fruits");
        record.set("name", "Banana");
        record.set("count", "many");
        assert_eq!(Fruit::decode(&record), None);

        record.set("count", 1i64);
        record.set("image", "not-an-asset");
        assert_eq!(Fruit::decode(&record), None);
    }

    #[test]
    fn test_decode_leaves_input_untouched() {
        let mut record = RawRecord::new("Fruits");
        record.set("name", "Banana");
        let before = record.clone();

        let _ = Fruit::decode(&record);
        assert_eq!(record, before);
    }
}
