use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// An uploaded original. `image_file` is relative to the store root.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EnteredImage {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub image_file: PathBuf,
}

/// Output of one filter run over an [`EnteredImage`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FilteredImage {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub image_file: PathBuf,
    pub source_id: Uuid,
    pub filter: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Entered(EnteredImage),
    Filtered(FilteredImage),
}

impl Record {
    pub fn id(&self) -> Uuid {
        match self {
            Record::Entered(r) => r.id,
            Record::Filtered(r) => r.id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_json_is_tagged() {
        let record = Record::Filtered(FilteredImage {
            id: Uuid::nil(),
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            image_file: PathBuf::from("filtered_images/a.jpg"),
            source_id: Uuid::nil(),
            filter: "blur".to_string(),
        });

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "filtered");
        assert_eq!(json["filter"], "blur");

        let back: Record = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
        assert_eq!(back.id(), Uuid::nil());
    }
}
