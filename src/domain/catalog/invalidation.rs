//! Declared cross-domain invalidation.
//!
//! A successful mutation refetches exactly the domains listed for it here,
//! once each. A failed mutation refetches nothing. Cascaded fetches are full
//! replacements, not merges.
//!
//! | Mutation | Refetches |
//! |---|---|
//! | item created / deleted | smart collections, wardrobe gaps |
//! | items marked washed | laundry alerts, wardrobe health |
//! | laundry status toggled | laundry alerts |
//! | outfit saved | wardrobe, laundry alerts, wardrobe health, usage analytics, style signature |
//! | AI history reset | usage analytics, style signature |
//! | trip completed | wardrobe, laundry alerts, trips |

use super::domain_kind::DomainKind;

/// Every mutation the store can perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    ItemCreated,
    ItemUpdated,
    ItemDeleted,
    ItemCleanToggled,
    ItemsMarkedWashed,
    LaundryStatusToggled,
    OutfitSaved,
    AiHistoryReset,
    TripCreated,
    TripUpdated,
    TripDeleted,
    TripCompleted,
    PackingItemToggled,
    NotificationRead,
    AllNotificationsRead,
}

/// One row of the invalidation table.
#[derive(Debug, Clone, Copy)]
pub struct InvalidationEdge {
    pub mutation: MutationKind,
    pub refetch: &'static [DomainKind],
}

use DomainKind::*;

/// The static invalidation table. Mutations absent from it refetch nothing.
pub const INVALIDATION_EDGES: &[InvalidationEdge] = &[
    InvalidationEdge {
        mutation: MutationKind::ItemCreated,
        refetch: &[SmartCollections, WardrobeGaps],
    },
    InvalidationEdge {
        mutation: MutationKind::ItemDeleted,
        refetch: &[SmartCollections, WardrobeGaps],
    },
    InvalidationEdge {
        mutation: MutationKind::ItemsMarkedWashed,
        refetch: &[LaundryAlerts, WardrobeHealth],
    },
    InvalidationEdge {
        mutation: MutationKind::LaundryStatusToggled,
        refetch: &[LaundryAlerts],
    },
    InvalidationEdge {
        mutation: MutationKind::OutfitSaved,
        refetch: &[
            Wardrobe,
            LaundryAlerts,
            WardrobeHealth,
            UsageAnalytics,
            StyleSignature,
        ],
    },
    InvalidationEdge {
        mutation: MutationKind::AiHistoryReset,
        refetch: &[UsageAnalytics, StyleSignature],
    },
    InvalidationEdge {
        mutation: MutationKind::TripCompleted,
        refetch: &[Wardrobe, LaundryAlerts, Trips],
    },
];

/// Domains to refetch after `mutation` succeeds.
pub fn refetch_set(mutation: MutationKind) -> &'static [DomainKind] {
    INVALIDATION_EDGES
        .iter()
        .find(|edge| edge.mutation == mutation)
        .map(|edge| edge.refetch)
        .unwrap_or(&[])
}
