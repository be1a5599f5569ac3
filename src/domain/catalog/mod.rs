//! Catalog domain - the independently cached collections of the wardrobe app.
//!
//! # Module Organization
//!
//! - `domain_kind` - The eleven cached domains and their payload shapes
//! - `collection` - Keyed, ordered collections with load/error status
//! - `invalidation` - Mutation kinds and the declared refetch table
//! - `models` - Typed views over records the client inspects directly

mod collection;
mod domain_kind;
mod invalidation;
mod models;

pub use collection::{DomainCollection, Record};
pub use domain_kind::{DomainKind, PayloadShape};
pub use invalidation::{refetch_set, InvalidationEdge, MutationKind, INVALIDATION_EDGES};
pub use models::{ClothingItem, Notification, PackingListItem, Trip, WashedPatch};
