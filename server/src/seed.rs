//! Fixture catalog for development and demo environments.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{City, CreativeWork, Person, Region, Showtime, Venue, WorkKind};
use crate::store::Store;
use crate::utils::AppResult;

#[derive(Debug, Clone, Default)]
pub struct Fixtures {
    pub regions: Vec<Region>,
    pub cities: Vec<City>,
    pub venues: Vec<Venue>,
    pub persons: Vec<Person>,
    pub works: Vec<CreativeWork>,
    pub showtimes: Vec<Showtime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub regions: usize,
    pub cities: usize,
    pub venues: usize,
    pub persons: usize,
    pub creative_works: usize,
    pub showtimes: usize,
}

impl From<&Fixtures> for SeedSummary {
    fn from(f: &Fixtures) -> Self {
        Self {
            regions: f.regions.len(),
            cities: f.cities.len(),
            venues: f.venues.len(),
            persons: f.persons.len(),
            creative_works: f.works.len(),
            showtimes: f.showtimes.len(),
        }
    }
}

pub const CATALOG_NOT_EMPTY: &str = "Catalog already contains creative works";

/// Insert the fixture catalog. Refused with `Conflict` once any work exists.
pub async fn run(store: &dyn Store) -> AppResult<SeedSummary> {
    let fixtures = catalog(Utc::now());
    store.insert_fixtures(&fixtures).await?;

    let summary = SeedSummary::from(&fixtures);
    tracing::info!(?summary, "Seeded fixture catalog");
    Ok(summary)
}

struct Builder {
    now: DateTime<Utc>,
    fixtures: Fixtures,
}

impl Builder {
    fn region(&mut self, name: &str, slug: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.fixtures.regions.push(Region {
            id,
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: self.now,
        });
        id
    }

    fn city(&mut self, region_id: Uuid, name: &str, slug: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.fixtures.cities.push(City {
            id,
            region_id,
            name: name.to_string(),
            slug: slug.to_string(),
            created_at: self.now,
        });
        id
    }

    fn venue(&mut self, city_id: Uuid, name: &str, address: &str, capacity: i32) -> Uuid {
        let id = Uuid::new_v4();
        self.fixtures.venues.push(Venue {
            id,
            city_id,
            name: name.to_string(),
            address: address.to_string(),
            capacity,
            created_at: self.now,
        });
        id
    }

    fn person(&mut self, full_name: &str, bio: &str) {
        self.fixtures.persons.push(Person {
            id: Uuid::new_v4(),
            full_name: full_name.to_string(),
            bio: Some(bio.to_string()),
            created_at: self.now,
            updated_at: self.now,
        });
    }

    /// `age_days` backdates `created_at` so "newest first" ordering is stable.
    #[allow(clippy::too_many_arguments)]
    fn work(
        &mut self,
        title: &str,
        slug: &str,
        kind: WorkKind,
        description: &str,
        duration_minutes: Option<i32>,
        featured: bool,
        age_days: i64,
    ) -> Uuid {
        let id = Uuid::new_v4();
        let created_at = self.now - Duration::days(age_days);
        self.fixtures.works.push(CreativeWork {
            id,
            title: title.to_string(),
            slug: slug.to_string(),
            kind,
            description: Some(description.to_string()),
            duration_minutes,
            featured,
            created_at,
            updated_at: created_at,
        });
        id
    }

    fn showtime(&mut self, work_id: Uuid, venue_id: Uuid, in_days: i64, price_pence: i64, seats: i32) {
        self.fixtures.showtimes.push(Showtime {
            id: Uuid::new_v4(),
            creative_work_id: work_id,
            venue_id,
            starts_at: self.now + Duration::days(in_days),
            price: Decimal::new(price_pence, 2),
            currency: "GBP".to_string(),
            total_seats: seats,
            available_seats: seats,
            created_at: self.now,
            updated_at: self.now,
        });
    }
}

/// Build the fixture catalog relative to `now`.
pub fn catalog(now: DateTime<Utc>) -> Fixtures {
    let mut b = Builder {
        now,
        fixtures: Fixtures::default(),
    };

    let london_region = b.region("Greater London", "greater-london");
    let scotland = b.region("Scotland", "scotland");

    let london = b.city(london_region, "London", "london");
    let edinburgh = b.city(scotland, "Edinburgh", "edinburgh");
    let glasgow = b.city(scotland, "Glasgow", "glasgow");

    let riverside = b.venue(london, "Riverside Cinema", "12 Bankside Walk, London", 180);
    let lyceum = b.venue(edinburgh, "Old Lyceum Theatre", "30 Grindlay Street, Edinburgh", 650);
    let hall = b.venue(glasgow, "Barrowfield Hall", "244 Gallowgate, Glasgow", 1200);
    let gallery = b.venue(edinburgh, "Canongate Gallery", "5 Canongate, Edinburgh", 90);

    b.person("Ines Marlow", "Director of coastal dramas for stage and screen.");
    b.person("Callum Reid", "Conductor of the Northern Strings ensemble.");
    b.person("Amara Okafor", "Paper artist and installation designer.");
    b.person("Tomasz Wren", "Actor, known for long-form stage work.");

    let long_light = b.work(
        "The Long Light",
        "the-long-light",
        WorkKind::Film,
        "A lighthouse keeper's last winter on a northern island.",
        Some(118),
        true,
        1,
    );
    let harbour = b.work(
        "Harbour Walls",
        "harbour-walls",
        WorkKind::Play,
        "A family drama set in a fishing town.",
        Some(135),
        true,
        2,
    );
    let strings = b.work(
        "Northern Strings: Winter Programme",
        "northern-strings-winter",
        WorkKind::Concert,
        "Chamber works for strings by Nordic and Scottish composers.",
        Some(95),
        false,
        3,
    );
    let paper = b.work(
        "Paper Cities",
        "paper-cities",
        WorkKind::Exhibition,
        "Cut-paper models of cities that never existed.",
        None,
        false,
        4,
    );

    b.showtime(long_light, riverside, 3, 1250, 180);
    b.showtime(long_light, riverside, 4, 1250, 180);
    b.showtime(harbour, lyceum, 7, 3200, 650);
    b.showtime(strings, hall, 10, 2800, 1200);
    b.showtime(paper, gallery, 1, 800, 90);

    b.fixtures
}
