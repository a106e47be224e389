//! Great-circle distance and nearest-neighbour search.

use crate::model::{ForecastArea, LatLng};

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Anything with an optional position on the map.
pub trait Located {
    fn location(&self) -> Option<LatLng>;
}

impl Located for LatLng {
    fn location(&self) -> Option<LatLng> {
        Some(*self)
    }
}

/// Haversine distance in kilometres between two WGS84 points.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_KM * c
}

/// Distance between two points, `None` if either has non-finite coordinates.
pub fn distance_between(a: LatLng, b: LatLng) -> Option<f64> {
    if !a.is_valid() || !b.is_valid() {
        return None;
    }
    Some(distance_km(a.lat, a.lng, b.lat, b.lng))
}

/// The candidate closest to `point`.
///
/// Candidates without a usable location are skipped. Ties keep the
/// first candidate in iteration order.
pub fn nearest<'a, T, I>(candidates: I, point: LatLng) -> Option<&'a T>
where
    T: Located + 'a,
    I: IntoIterator<Item = &'a T>,
{
    let mut best: Option<(&T, f64)> = None;
    for candidate in candidates {
        let Some(d) = candidate
            .location()
            .and_then(|loc| distance_between(point, loc))
        else {
            continue;
        };
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((candidate, d)),
        }
    }
    best.map(|(c, _)| c)
}

/// Name of the forecast area whose label location is nearest to `point`.
pub fn nearest_forecast_area(point: LatLng, metadata: &[ForecastArea]) -> Option<String> {
    nearest(metadata, point).map(|area| area.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Site {
        name: &'static str,
        at: Option<LatLng>,
    }

    impl Located for Site {
        fn location(&self) -> Option<LatLng> {
            self.at
        }
    }

    const CITY: LatLng = LatLng {
        lat: 1.3521,
        lng: 103.8198,
    };

    /// Point `km` kilometres due north of `from`.
    fn north_of(from: LatLng, km: f64) -> LatLng {
        LatLng::new(from.lat + (km / EARTH_RADIUS_KM).to_degrees(), from.lng)
    }

    #[test]
    fn zero_distance() {
        assert_eq!(distance_km(1.3, 103.8, 1.3, 103.8), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let d = distance_km(0.0, 103.8, 1.0, 103.8);
        assert!((d - 111.195).abs() < 0.01, "got {}", d);
    }

    #[test]
    fn nearest_picks_closer_station() {
        let sites = vec![
            Site {
                name: "five",
                at: Some(north_of(CITY, 5.0)),
            },
            Site {
                name: "two",
                at: Some(north_of(CITY, 2.0)),
            },
        ];
        assert_eq!(nearest(&sites, CITY).unwrap().name, "two");
    }

    #[test]
    fn nearest_skips_unusable_locations() {
        let sites = vec![
            Site {
                name: "nowhere",
                at: None,
            },
            Site {
                name: "nan",
                at: Some(LatLng::new(f64::NAN, 103.8)),
            },
            Site {
                name: "far",
                at: Some(north_of(CITY, 9.0)),
            },
        ];
        assert_eq!(nearest(&sites, CITY).unwrap().name, "far");
    }

    #[test]
    fn nearest_tie_keeps_first() {
        let sites = vec![
            Site {
                name: "first",
                at: Some(north_of(CITY, 3.0)),
            },
            Site {
                name: "second",
                at: Some(north_of(CITY, 3.0)),
            },
        ];
        assert_eq!(nearest(&sites, CITY).unwrap().name, "first");
    }

    #[test]
    fn nearest_of_nothing_is_none() {
        let sites: Vec<Site> = Vec::new();
        assert!(nearest(&sites, CITY).is_none());
    }

    #[test]
    fn forecast_area_lookup() {
        let metadata = vec![
            ForecastArea {
                name: "Changi".to_string(),
                location: Some(LatLng::new(1.357, 103.987)),
            },
            ForecastArea {
                name: "Bishan".to_string(),
                location: Some(LatLng::new(1.350772, 103.839)),
            },
        ];
        assert_eq!(
            nearest_forecast_area(CITY, &metadata).as_deref(),
            Some("Bishan")
        );
        assert_eq!(nearest_forecast_area(CITY, &[]), None);
    }
}
