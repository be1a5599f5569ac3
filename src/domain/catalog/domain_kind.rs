//! The cached domains.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use super::collection::Record;
use crate::domain::foundation::ValidationError;

/// One independently fetched and cached collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainKind {
    Wardrobe,
    LaundryAlerts,
    WardrobeHealth,
    SmartCollections,
    WardrobeGaps,
    UsageAnalytics,
    StyleSignature,
    Trips,
    PackingList,
    OutfitHistory,
    Notifications,
}

/// How a fetch response body maps onto collection records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadShape {
    /// The records are an array under the named field.
    Field(&'static str),
    /// The body itself is an array of records.
    Array,
    /// The body is one derived view, stored as a single record keyed by slug.
    Snapshot,
}

impl DomainKind {
    /// Every domain, in the order they are reset and reported.
    pub const ALL: [DomainKind; 11] = [
        DomainKind::Wardrobe,
        DomainKind::LaundryAlerts,
        DomainKind::WardrobeHealth,
        DomainKind::SmartCollections,
        DomainKind::WardrobeGaps,
        DomainKind::UsageAnalytics,
        DomainKind::StyleSignature,
        DomainKind::Trips,
        DomainKind::PackingList,
        DomainKind::OutfitHistory,
        DomainKind::Notifications,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            DomainKind::Wardrobe => "wardrobe",
            DomainKind::LaundryAlerts => "laundry-alerts",
            DomainKind::WardrobeHealth => "wardrobe-health",
            DomainKind::SmartCollections => "smart-collections",
            DomainKind::WardrobeGaps => "wardrobe-gaps",
            DomainKind::UsageAnalytics => "usage-analytics",
            DomainKind::StyleSignature => "style-signature",
            DomainKind::Trips => "trips",
            DomainKind::PackingList => "packing-list",
            DomainKind::OutfitHistory => "outfit-history",
            DomainKind::Notifications => "notifications",
        }
    }

    pub fn payload(&self) -> PayloadShape {
        match self {
            DomainKind::Wardrobe | DomainKind::PackingList => PayloadShape::Field("items"),
            DomainKind::OutfitHistory => PayloadShape::Field("outfits"),
            DomainKind::Trips | DomainKind::Notifications => PayloadShape::Array,
            DomainKind::LaundryAlerts
            | DomainKind::WardrobeHealth
            | DomainKind::SmartCollections
            | DomainKind::WardrobeGaps
            | DomainKind::UsageAnalytics
            | DomainKind::StyleSignature => PayloadShape::Snapshot,
        }
    }

    /// Derived views are computed server-side and only ever replaced.
    pub fn is_derived(&self) -> bool {
        self.payload() == PayloadShape::Snapshot
    }

    /// Converts a fetch response body into the records of this domain.
    pub fn extract_records(&self, body: Value) -> Result<Vec<Record>, ValidationError> {
        let items = match self.payload() {
            PayloadShape::Snapshot => return Ok(vec![Record::snapshot(*self, body)]),
            PayloadShape::Array => body,
            PayloadShape::Field(field) => match body {
                Value::Object(mut map) => map
                    .remove(field)
                    .ok_or_else(|| ValidationError::empty_field(field))?,
                _ => {
                    return Err(ValidationError::invalid_format(
                        self.slug(),
                        "expected a JSON object",
                    ))
                }
            },
        };

        match items {
            Value::Array(values) => values.into_iter().map(Record::from_value).collect(),
            _ => Err(ValidationError::invalid_format(
                self.slug(),
                "expected a JSON array of records",
            )),
        }
    }
}

impl fmt::Display for DomainKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}
