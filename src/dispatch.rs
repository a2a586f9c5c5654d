//! Dispatch ordering — which workers to notify for an alert.
//!
//! The roster is small (a handful of ASHA/ANM/CHO per catchment area), so
//! ranking is a straight haversine sort over available workers.

use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::models::{HealthWorker, Location};

/// Mean Earth radius in kilometres.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Great-circle distance between two points, in kilometres.
pub fn haversine_km(a: Location, b: Location) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// A worker with their distance to the alert, closest first.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RankedWorker {
    #[serde(flatten)]
    pub worker: HealthWorker,
    pub distance_km: f64,
}

/// Available workers ranked by distance to `location`, at most `limit`.
pub fn nearest_workers(
    conn: &Connection,
    location: Location,
    limit: usize,
) -> Result<Vec<RankedWorker>, DatabaseError> {
    let mut ranked: Vec<RankedWorker> = db::list_available_workers(conn)?
        .into_iter()
        .map(|worker| {
            let distance_km = haversine_km(location, worker.station);
            RankedWorker { worker, distance_km }
        })
        .collect();

    ranked.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    ranked.truncate(limit);
    Ok(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{insert_worker, open_memory_database};
    use crate::models::WorkerRole;
    use uuid::Uuid;

    fn worker_at(name: &str, latitude: f64, longitude: f64, available: bool) -> HealthWorker {
        HealthWorker {
            id: Uuid::new_v4(),
            name: name.to_string(),
            role: WorkerRole::Asha,
            phone: "+91-9000000000".to_string(),
            station: Location { latitude, longitude },
            available,
        }
    }

    #[test]
    fn haversine_zero_for_same_point() {
        let p = Location { latitude: 12.9, longitude: 77.6 };
        assert!(haversine_km(p, p) < 1e-9);
    }

    #[test]
    fn haversine_known_distance() {
        // Bengaluru to Chennai, roughly 290 km
        let blr = Location { latitude: 12.9716, longitude: 77.5946 };
        let maa = Location { latitude: 13.0827, longitude: 80.2707 };
        let d = haversine_km(blr, maa);
        assert!((280.0..300.0).contains(&d), "got {d} km");
    }

    #[test]
    fn haversine_symmetric() {
        let a = Location { latitude: 12.9, longitude: 77.6 };
        let b = Location { latitude: 28.6, longitude: 77.2 };
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn nearest_sorted_closest_first() {
        let conn = open_memory_database().unwrap();
        insert_worker(&conn, &worker_at("far", 13.5, 78.0, true)).unwrap();
        insert_worker(&conn, &worker_at("near", 12.91, 77.61, true)).unwrap();
        insert_worker(&conn, &worker_at("mid", 13.0, 77.7, true)).unwrap();

        let alert_loc = Location { latitude: 12.9, longitude: 77.6 };
        let ranked = nearest_workers(&conn, alert_loc, 10).unwrap();

        let names: Vec<&str> = ranked.iter().map(|r| r.worker.name.as_str()).collect();
        assert_eq!(names, vec!["near", "mid", "far"]);
        assert!(ranked[0].distance_km < ranked[1].distance_km);
    }

    #[test]
    fn nearest_respects_limit_and_availability() {
        let conn = open_memory_database().unwrap();
        insert_worker(&conn, &worker_at("a", 12.91, 77.61, true)).unwrap();
        insert_worker(&conn, &worker_at("b", 12.92, 77.62, true)).unwrap();
        insert_worker(&conn, &worker_at("off-duty", 12.90, 77.60, false)).unwrap();

        let alert_loc = Location { latitude: 12.9, longitude: 77.6 };
        let ranked = nearest_workers(&conn, alert_loc, 1).unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].worker.name, "a");
    }
}
