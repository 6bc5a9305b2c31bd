#![allow(dead_code)]

use allocdb::{
    AllocationConfig, AllocationKey, AllocationScheme, AllocationService, EntityKind,
    EntityReference, FixedClock, Measurable, MeasurableCategory, MeasurableRating,
};
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub const SCHEME: i64 = 10;
pub const CATEGORY: i64 = 1;
pub const OTHER_SCHEME: i64 = 20;
pub const OTHER_CATEGORY: i64 = 2;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

pub fn app(id: i64) -> EntityReference {
    EntityReference::new(EntityKind::Application, id)
}

pub fn key(measurable_id: i64, entity: EntityReference) -> AllocationKey {
    AllocationKey::new(measurable_id, entity)
}

/// Service with two schemes over two categories: measurables 1..=7 in the
/// first category, 100 and 101 in the second. No ratings, no allocations.
pub fn service() -> AllocationService {
    let service =
        AllocationService::with_clock(AllocationConfig::default(), Arc::new(FixedClock(t0())))
            .unwrap();

    for (id, name) in [(CATEGORY, "Capabilities"), (OTHER_CATEGORY, "Processes")] {
        service
            .create_category(&MeasurableCategory {
                id,
                name: name.into(),
            })
            .unwrap();
    }
    for (id, category_id) in (1..=7)
        .map(|id| (id, CATEGORY))
        .chain([(100, OTHER_CATEGORY), (101, OTHER_CATEGORY)])
    {
        service
            .create_measurable(&Measurable {
                id,
                category_id,
                name: format!("Measurable {}", id),
                external_id: None,
            })
            .unwrap();
    }
    for (id, category) in [(SCHEME, CATEGORY), (OTHER_SCHEME, OTHER_CATEGORY)] {
        service
            .create_scheme(&AllocationScheme {
                id,
                name: format!("Scheme {}", id),
                description: None,
                measurable_category_id: category,
            })
            .unwrap();
    }
    service
}

pub fn rate(service: &AllocationService, measurable_id: i64, entity: EntityReference) {
    service
        .save_rating(&MeasurableRating {
            measurable_id,
            entity_reference: entity,
            rating: "G".into(),
            last_updated_at: t0(),
            last_updated_by: "rater".into(),
            provenance: "allocdb".into(),
        })
        .unwrap();
}

pub fn allocate(service: &AllocationService, measurable_ids: &[i64], entity: EntityReference) {
    service
        .insert_many(
            measurable_ids.iter().map(|m| key(*m, entity)),
            SCHEME,
            "seed",
        )
        .unwrap();
}

/// Ratings on {1,2,3} and allocations on {2,3,4} for APPLICATION/55 in SCHEME.
pub fn scenario() -> (AllocationService, EntityReference) {
    let service = service();
    let e = app(55);
    for m in [1, 2, 3] {
        rate(&service, m, e);
    }
    allocate(&service, &[2, 3, 4], e);
    (service, e)
}
