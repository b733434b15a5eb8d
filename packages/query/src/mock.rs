//! Built-in restaurant dataset served when the live source is unavailable.
//!
//! Filtering here follows the same rules as the SQL produced by
//! [`crate::builder`]: exact borough match, case-insensitive cuisine
//! substring, the grade ladder (ungraded restaurants never pass a minimum
//! grade), newest inspection first, then the limit.

use std::sync::LazyLock;

use async_trait::async_trait;
use restaurant_finder_query_models::{
    Borough, DetailsQuery, DetailsResponse, DistinctColumn, DistinctValues, Filter, Grade,
    QueryInfo, ResponseEnvelope, RestaurantRecord,
};

use crate::source::{QueryError, QuerySource};

struct Seed {
    name: &'static str,
    borough: Borough,
    building: &'static str,
    street: &'static str,
    zipcode: &'static str,
    cuisine: &'static str,
    grade: Option<Grade>,
    score: Option<i64>,
    inspection_date: &'static str,
    location: (f64, f64),
}

const SEEDS: &[Seed] = &[
    Seed {
        name: "Joe's Pizza",
        borough: Borough::Manhattan,
        building: "123",
        street: "Broadway",
        zipcode: "10001",
        cuisine: "Pizza",
        grade: Some(Grade::A),
        score: Some(12),
        inspection_date: "2023-10-15",
        location: (40.7589, -73.9851),
    },
    Seed {
        name: "Brooklyn Deli",
        borough: Borough::Brooklyn,
        building: "456",
        street: "Atlantic Ave",
        zipcode: "11201",
        cuisine: "Delicatessen",
        grade: Some(Grade::B),
        score: Some(18),
        inspection_date: "2023-10-14",
        location: (40.6892, -73.9442),
    },
    Seed {
        name: "Queens Bistro",
        borough: Borough::Queens,
        building: "789",
        street: "Northern Blvd",
        zipcode: "11101",
        cuisine: "American",
        grade: Some(Grade::A),
        score: Some(8),
        inspection_date: "2023-10-13",
        location: (40.7282, -73.9442),
    },
    Seed {
        name: "Bleecker Street Pizza",
        borough: Borough::Manhattan,
        building: "69",
        street: "7th Ave S",
        zipcode: "10014",
        cuisine: "Pizza",
        grade: Some(Grade::B),
        score: Some(16),
        inspection_date: "2023-10-12",
        location: (40.7320, -74.0036),
    },
    Seed {
        name: "Arthur Avenue Trattoria",
        borough: Borough::Bronx,
        building: "2335",
        street: "Arthur Ave",
        zipcode: "10458",
        cuisine: "Italian",
        grade: Some(Grade::A),
        score: Some(10),
        inspection_date: "2023-10-11",
        location: (40.8546, -73.8880),
    },
    Seed {
        name: "Harbor Pizza Place",
        borough: Borough::StatenIsland,
        building: "1",
        street: "Bay St",
        zipcode: "10301",
        cuisine: "Pizza Place",
        grade: Some(Grade::C),
        score: Some(31),
        inspection_date: "2023-10-10",
        location: (40.6437, -74.0736),
    },
    Seed {
        name: "Midtown Noodle Bar",
        borough: Borough::Manhattan,
        building: "250",
        street: "W 43rd St",
        zipcode: "10036",
        cuisine: "Chinese",
        grade: Some(Grade::P),
        score: Some(35),
        inspection_date: "2023-10-09",
        location: (40.7577, -73.9886),
    },
    Seed {
        name: "Flushing Dumpling House",
        borough: Borough::Queens,
        building: "41-28",
        street: "Main St",
        zipcode: "11355",
        cuisine: "Chinese",
        grade: Some(Grade::Z),
        score: None,
        inspection_date: "2023-10-08",
        location: (40.7580, -73.8303),
    },
    Seed {
        name: "Grand Concourse Grill",
        borough: Borough::Bronx,
        building: "900",
        street: "Grand Concourse",
        zipcode: "10451",
        cuisine: "American",
        grade: None,
        score: Some(22),
        inspection_date: "2023-10-07",
        location: (40.8276, -73.9229),
    },
    Seed {
        name: "Williamsburg Pizza",
        borough: Borough::Brooklyn,
        building: "265",
        street: "Union Ave",
        zipcode: "11211",
        cuisine: "Pizza",
        grade: Some(Grade::A),
        score: Some(9),
        inspection_date: "2023-10-06",
        location: (40.7085, -73.9510),
    },
    Seed {
        name: "Staten Island Bagels",
        borough: Borough::StatenIsland,
        building: "1750",
        street: "Hylan Blvd",
        zipcode: "10305",
        cuisine: "Bagels/Pretzels",
        grade: Some(Grade::A),
        score: Some(5),
        inspection_date: "2023-10-05",
        location: (40.5901, -74.0928),
    },
    Seed {
        name: "Greenpoint Diner",
        borough: Borough::Brooklyn,
        building: "1000",
        street: "Manhattan Ave",
        zipcode: "11222",
        cuisine: "American",
        grade: Some(Grade::C),
        score: Some(29),
        inspection_date: "2023-10-03",
        location: (40.7304, -73.9541),
    },
    Seed {
        name: "Prince Street Pizza",
        borough: Borough::Manhattan,
        building: "27",
        street: "Prince St",
        zipcode: "10012",
        cuisine: "Pizza",
        grade: Some(Grade::A),
        score: Some(7),
        inspection_date: "2023-09-30",
        location: (40.7231, -73.9945),
    },
    Seed {
        name: "Joe's Pizza",
        borough: Borough::Manhattan,
        building: "123",
        street: "Broadway",
        zipcode: "10001",
        cuisine: "Pizza",
        grade: Some(Grade::B),
        score: Some(14),
        inspection_date: "2023-03-02",
        location: (40.7589, -73.9851),
    },
];

static DATASET: LazyLock<Vec<RestaurantRecord>> = LazyLock::new(|| {
    let mut records: Vec<RestaurantRecord> = SEEDS
        .iter()
        .map(|seed| RestaurantRecord {
            building: Some(seed.building.to_string()),
            street: Some(seed.street.to_string()),
            zipcode: Some(seed.zipcode.to_string()),
            cuisine: Some(seed.cuisine.to_string()),
            inspection_date: Some(seed.inspection_date.to_string()),
            grade_date: seed.grade.map(|_| seed.inspection_date.to_string()),
            inspection_type: Some("Cycle Inspection / Initial Inspection".to_string()),
            score: seed.score,
            grade: seed.grade,
            latitude: Some(seed.location.0),
            longitude: Some(seed.location.1),
            ..RestaurantRecord::new(seed.name, seed.borough)
        })
        .collect();
    sort_newest_first(&mut records);
    records
});

/// Returns the built-in dataset, newest inspection first.
#[must_use]
pub fn dataset() -> &'static [RestaurantRecord] {
    &DATASET
}

/// Whether `record` passes every condition in `filter` (ignoring the
/// limit).
#[must_use]
pub fn matches(record: &RestaurantRecord, filter: &Filter) -> bool {
    if filter.borough().is_some_and(|b| b != record.borough) {
        return false;
    }

    if filter
        .cuisine()
        .is_some_and(|c| !contains_ignore_case(record.cuisine.as_deref(), c))
    {
        return false;
    }

    filter
        .min_grade()
        .is_none_or(|minimum| record.grade.is_some_and(|g| g.satisfies_minimum(minimum)))
}

/// Serves restaurant queries from the built-in dataset.
#[derive(Debug, Clone, Copy, Default)]
pub struct MockSource;

impl MockSource {
    /// Filters the dataset with `filter` and truncates to its limit.
    ///
    /// The response is always flagged as mock data.
    #[must_use]
    pub fn respond(&self, filter: &Filter) -> ResponseEnvelope {
        let records = dataset()
            .iter()
            .filter(|r| matches(r, filter))
            .take(limit_len(filter.limit()))
            .cloned()
            .collect();

        ResponseEnvelope::new(records, QueryInfo::mock(filter.clone()))
    }

    /// Finds every inspection of the restaurants whose name contains the
    /// queried name, newest first.
    #[must_use]
    pub fn lookup(&self, query: &DetailsQuery, limit: u32) -> DetailsResponse {
        let inspections = dataset()
            .iter()
            .filter(|r| contains_ignore_case(Some(&r.name), query.name()))
            .filter(|r| query.borough().is_none_or(|b| b == r.borough))
            .take(limit_len(limit))
            .cloned()
            .collect();

        DetailsResponse::new(query, inspections, true)
    }

    /// Lists the distinct values of `column` across the dataset.
    #[must_use]
    pub fn list(&self, column: DistinctColumn) -> DistinctValues {
        let values = dataset().iter().filter_map(|r| match column {
            DistinctColumn::Borough => Some(r.borough.warehouse_name().to_string()),
            DistinctColumn::Cuisine => r.cuisine.clone(),
        });
        DistinctValues::new(values, true)
    }
}

#[async_trait]
impl QuerySource for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    async fn search(&self, filter: &Filter) -> Result<ResponseEnvelope, QueryError> {
        Ok(self.respond(filter))
    }

    async fn details(
        &self,
        query: &DetailsQuery,
        limit: u32,
    ) -> Result<DetailsResponse, QueryError> {
        Ok(self.lookup(query, limit))
    }

    async fn distinct(&self, column: DistinctColumn) -> Result<DistinctValues, QueryError> {
        Ok(self.list(column))
    }

    async fn ping(&self) -> Result<(), QueryError> {
        Ok(())
    }
}

fn contains_ignore_case(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_uppercase().contains(&needle.to_uppercase()))
}

fn sort_newest_first(records: &mut [RestaurantRecord]) {
    records.sort_by(|a, b| b.inspection_date.cmp(&a.inspection_date));
}

fn limit_len(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}
