//! API routes for fetches and mutations.
//!
//! Paths are relative to the API base URL. `{id}` is replaced with the
//! target record id.

use http::Method;
use serde_json::Value;

use crate::domain::catalog::{DomainKind, MutationKind, Record};
use crate::domain::foundation::{RecordId, ValidationError};

/// Fetch path for a domain. The packing list needs the active trip.
pub fn fetch_path(domain: DomainKind, active_trip: Option<&RecordId>) -> Option<String> {
    let path = match domain {
        DomainKind::Wardrobe => "/get-wardrobe",
        DomainKind::LaundryAlerts => "/laundry/alerts",
        DomainKind::WardrobeHealth => "/laundry/health-score",
        DomainKind::SmartCollections => "/intelligence/collections",
        DomainKind::WardrobeGaps => "/intelligence/gaps",
        DomainKind::UsageAnalytics => "/analytics/usage",
        DomainKind::StyleSignature => "/analytics/style-dna",
        DomainKind::Trips => "/trips",
        DomainKind::OutfitHistory => "/outfit-history",
        DomainKind::Notifications => "/notifications",
        DomainKind::PackingList => {
            return active_trip.map(|trip| format!("/trips/{}/packing-list", trip))
        }
    };
    Some(path.to_string())
}

/// Where the changed record sits in a mutation response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Wrapped under a field, e.g. `{"item": {...}}`.
    Field(&'static str),
    /// The body is the record.
    Bare,
    /// The body carries no record.
    Ignored,
}

impl ResponseShape {
    pub fn extract(&self, body: Value) -> Result<Option<Record>, ValidationError> {
        let value = match (self, body) {
            (ResponseShape::Ignored, _) => return Ok(None),
            (ResponseShape::Bare, body) => body,
            (ResponseShape::Field(field), Value::Object(mut map)) => map
                .remove(*field)
                .ok_or_else(|| ValidationError::empty_field(*field))?,
            (ResponseShape::Field(field), _) => {
                return Err(ValidationError::invalid_format(*field, "expected a JSON object"))
            }
        };
        Record::from_value(value).map(Some)
    }
}

/// How a successful mutation changes the local collections before its
/// cascade runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalEffect {
    /// Splice the returned record by id.
    Upsert(DomainKind),
    /// Put the returned record first.
    Prepend(DomainKind),
    /// Remove the target id.
    Remove(DomainKind),
    /// Empty the collection.
    Clear(DomainKind),
    /// Mark the wardrobe items named in `item_ids` as freshly washed.
    PatchWashed,
    /// Flag every notification as read.
    MarkAllRead,
    /// Leave everything to the cascade.
    Nothing,
}

impl LocalEffect {
    /// The collection the effect lands in, also where failures are reported.
    pub fn domain(&self) -> Option<DomainKind> {
        match self {
            LocalEffect::Upsert(d)
            | LocalEffect::Prepend(d)
            | LocalEffect::Remove(d)
            | LocalEffect::Clear(d) => Some(*d),
            LocalEffect::PatchWashed => Some(DomainKind::Wardrobe),
            LocalEffect::MarkAllRead => Some(DomainKind::Notifications),
            LocalEffect::Nothing => None,
        }
    }
}

/// One mutation endpoint.
#[derive(Debug, Clone)]
pub struct MutationRoute {
    pub kind: MutationKind,
    pub method: Method,
    pub template: &'static str,
    pub response: ResponseShape,
    pub effect: LocalEffect,
}

impl MutationRoute {
    pub fn needs_id(&self) -> bool {
        self.template.contains("{id}")
    }

    /// Concrete path for `id`. Returns `None` when the template needs an id
    /// and none was given.
    pub fn path(&self, id: Option<&RecordId>) -> Option<String> {
        match (self.needs_id(), id) {
            (true, Some(id)) => Some(self.template.replace("{id}", id.as_str())),
            (true, None) => None,
            (false, _) => Some(self.template.to_string()),
        }
    }
}

fn route(
    kind: MutationKind,
    method: Method,
    template: &'static str,
    response: ResponseShape,
    effect: LocalEffect,
) -> MutationRoute {
    MutationRoute {
        kind,
        method,
        template,
        response,
        effect,
    }
}

/// The route for a mutation.
pub fn mutation_route(kind: MutationKind) -> MutationRoute {
    use DomainKind::*;
    use LocalEffect::*;
    use MutationKind as M;
    use ResponseShape::*;

    match kind {
        M::ItemCreated => route(kind, Method::POST, "/add-item", Field("item"), Upsert(Wardrobe)),
        M::ItemUpdated => route(kind, Method::PUT, "/update-item/{id}", Field("item"), Upsert(Wardrobe)),
        M::ItemDeleted => route(kind, Method::DELETE, "/delete-item/{id}", Ignored, Remove(Wardrobe)),
        M::ItemCleanToggled => route(kind, Method::PATCH, "/toggle-clean/{id}", Field("item"), Upsert(Wardrobe)),
        M::ItemsMarkedWashed => route(kind, Method::POST, "/laundry/mark-washed", Ignored, PatchWashed),
        M::LaundryStatusToggled => route(
            kind,
            Method::PATCH,
            "/laundry/toggle-status/{id}",
            Field("item"),
            Upsert(Wardrobe),
        ),
        M::OutfitSaved => route(kind, Method::POST, "/save-outfit", Field("outfit"), Prepend(OutfitHistory)),
        M::AiHistoryReset => route(kind, Method::DELETE, "/outfit-history", Ignored, Clear(OutfitHistory)),
        M::TripCreated => route(kind, Method::POST, "/trips", Bare, Upsert(Trips)),
        M::TripUpdated => route(kind, Method::PUT, "/trips/{id}", Bare, Upsert(Trips)),
        M::TripDeleted => route(kind, Method::DELETE, "/trips/{id}", Ignored, Remove(Trips)),
        M::TripCompleted => route(kind, Method::POST, "/trips/{id}/complete", Ignored, Nothing),
        M::PackingItemToggled => route(
            kind,
            Method::POST,
            "/packing-list-items/{id}/toggle",
            Bare,
            Upsert(PackingList),
        ),
        M::NotificationRead => route(kind, Method::POST, "/notifications/{id}/read", Bare, Upsert(Notifications)),
        M::AllNotificationsRead => route(kind, Method::POST, "/notifications/mark-all-read", Ignored, MarkAllRead),
    }
}

/// The uniform per-domain operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudOp {
    Create,
    Update,
    Delete,
    Toggle,
}

impl std::fmt::Display for CrudOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CrudOp::Create => "create",
            CrudOp::Update => "update",
            CrudOp::Delete => "delete",
            CrudOp::Toggle => "toggle",
        };
        f.write_str(name)
    }
}

/// Which mutation a uniform operation on `domain` performs, if any.
pub fn crud_mutation(domain: DomainKind, op: CrudOp) -> Option<MutationKind> {
    use MutationKind as M;

    if domain.is_derived() {
        return None;
    }
    match (domain, op) {
        (DomainKind::Wardrobe, CrudOp::Create) => Some(M::ItemCreated),
        (DomainKind::Wardrobe, CrudOp::Update) => Some(M::ItemUpdated),
        (DomainKind::Wardrobe, CrudOp::Delete) => Some(M::ItemDeleted),
        (DomainKind::Wardrobe, CrudOp::Toggle) => Some(M::ItemCleanToggled),
        (DomainKind::Trips, CrudOp::Create) => Some(M::TripCreated),
        (DomainKind::Trips, CrudOp::Update) => Some(M::TripUpdated),
        (DomainKind::Trips, CrudOp::Delete) => Some(M::TripDeleted),
        (DomainKind::PackingList, CrudOp::Toggle) => Some(M::PackingItemToggled),
        (DomainKind::OutfitHistory, CrudOp::Create) => Some(M::OutfitSaved),
        (DomainKind::Notifications, CrudOp::Toggle) => Some(M::NotificationRead),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn packing_list_needs_active_trip() {
        assert_eq!(fetch_path(DomainKind::PackingList, None), None);
        let trip = RecordId::from(4);
        assert_eq!(
            fetch_path(DomainKind::PackingList, Some(&trip)).as_deref(),
            Some("/trips/4/packing-list")
        );
    }

    #[test]
    fn every_other_domain_has_a_fixed_path() {
        for domain in DomainKind::ALL {
            if domain != DomainKind::PackingList {
                assert!(fetch_path(domain, None).is_some(), "{}", domain);
            }
        }
    }

    #[test]
    fn path_substitutes_id() {
        let route = mutation_route(MutationKind::ItemUpdated);
        assert_eq!(
            route.path(Some(&RecordId::from(17))).as_deref(),
            Some("/update-item/17")
        );
        assert_eq!(route.path(None), None);
    }

    #[test]
    fn routes_without_id_ignore_it() {
        let route = mutation_route(MutationKind::ItemsMarkedWashed);
        assert!(!route.needs_id());
        assert_eq!(route.path(None).as_deref(), Some("/laundry/mark-washed"));
    }

    #[test]
    fn every_route_reports_its_own_kind() {
        use MutationKind::*;
        for kind in [
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
        ] {
            assert_eq!(mutation_route(kind).kind, kind);
        }
    }

    #[test]
    fn wrapped_response_is_unwrapped() {
        let record = ResponseShape::Field("item")
            .extract(json!({"item": {"id": 3, "name": "Coat"}}))
            .unwrap()
            .unwrap();
        assert_eq!(record.id(), &RecordId::from(3));
    }

    #[test]
    fn missing_wrapper_is_an_error() {
        assert!(ResponseShape::Field("outfit").extract(json!({"id": 1})).is_err());
    }

    #[test]
    fn ignored_response_yields_nothing() {
        assert_eq!(
            ResponseShape::Ignored.extract(json!({"message": "ok"})).unwrap(),
            None
        );
    }

    #[test]
    fn crud_mapping_rejects_derived_views() {
        assert_eq!(crud_mutation(DomainKind::WardrobeGaps, CrudOp::Create), None);
        assert_eq!(
            crud_mutation(DomainKind::Wardrobe, CrudOp::Toggle),
            Some(MutationKind::ItemCleanToggled)
        );
    }
}
