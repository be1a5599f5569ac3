//! Typed views over API records.
//!
//! The store keeps records as JSON so unknown fields survive a splice; these
//! models are decoded on demand where the client needs to reason about
//! specific fields.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::collection::Record;
use crate::domain::foundation::{RecordId, Timestamp};

/// A server-created notification. The client only ever flips `is_read`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: RecordId,
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: Timestamp,
    #[serde(default)]
    pub link: Option<String>,
}

impl TryFrom<Notification> for Record {
    type Error = serde_json::Error;

    fn try_from(notification: Notification) -> Result<Self, Self::Error> {
        let body = serde_json::to_value(&notification)?;
        Record::from_value(body).map_err(serde::de::Error::custom)
    }
}

/// A wardrobe item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClothingItem {
    pub id: RecordId,
    pub name: String,
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default = "default_true")]
    pub is_clean: bool,
    #[serde(default)]
    pub needs_washing: bool,
    #[serde(default)]
    pub wear_count_since_wash: u32,
    #[serde(default)]
    pub laundry_status: Option<String>,
    #[serde(default)]
    pub last_washed: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A planned trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    pub id: RecordId,
    pub destination: String,
    pub start_date: String,
    pub end_date: String,
    #[serde(default)]
    pub trip_type: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One line of the active packing list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackingListItem {
    pub id: RecordId,
    #[serde(default)]
    pub is_packed: bool,
    #[serde(default)]
    pub clothing_item_id: Option<RecordId>,
}

/// Local patch applied to wardrobe items once the API confirms a wash.
#[derive(Debug, Clone)]
pub struct WashedPatch {
    washed_at: Timestamp,
}

impl WashedPatch {
    pub fn at(washed_at: Timestamp) -> Self {
        Self { washed_at }
    }

    fn fields(&self) -> [(&'static str, Value); 6] {
        [
            ("wear_count_since_wash", json!(0)),
            ("is_clean", json!(true)),
            ("needs_washing", json!(false)),
            ("wash_urgency", json!("none")),
            ("laundry_status", json!("clean")),
            ("last_washed", json!(self.washed_at.to_rfc3339())),
        ]
    }

    pub fn apply(&self, record: &mut Record) {
        for (field, value) in self.fields() {
            record.set(field, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_decodes_from_api_shape() {
        let n: Notification = serde_json::from_value(json!({
            "id": 12,
            "message": "Your trip to Oslo starts tomorrow",
            "is_read": false,
            "created_at": "2024-05-01T09:00:00.000001",
            "link": "/trips/3"
        }))
        .unwrap();
        assert_eq!(n.id, RecordId::from(12));
        assert_eq!(n.link.as_deref(), Some("/trips/3"));
    }

    #[test]
    fn notification_converts_to_record() {
        let n: Notification = serde_json::from_value(json!({
            "id": 1, "message": "hi", "created_at": "2024-05-01T09:00:00Z"
        }))
        .unwrap();
        let record = Record::try_from(n).unwrap();
        assert_eq!(record.id(), &RecordId::from(1));
        assert_eq!(record.get("is_read"), Some(&json!(false)));
    }

    #[test]
    fn washed_patch_resets_laundry_fields() {
        let mut record = Record::from_value(json!({
            "id": 3, "name": "Shirt", "type": "top",
            "is_clean": false, "wear_count_since_wash": 4, "needs_washing": true
        }))
        .unwrap();

        WashedPatch::at(Timestamp::now()).apply(&mut record);

        let item: ClothingItem = record.decode().unwrap();
        assert!(item.is_clean);
        assert!(!item.needs_washing);
        assert_eq!(item.wear_count_since_wash, 0);
        assert_eq!(item.laundry_status.as_deref(), Some("clean"));
        assert!(item.last_washed.is_some());
    }
}
