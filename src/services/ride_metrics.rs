// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Ride metrics: distances, GPS noise filtering, speeds and display formatting.
//!
//! Phones report noisy fixes (0/0 before a lock, jumps across town when the
//! network location kicks in). Segments that imply an impossible speed are
//! dropped from the distance so one bad fix can't inflate a ride.

use crate::models::ride::{LocationPoint, Ride};
use geo::{Distance, Haversine, Point};
use serde::Serialize;

/// Anything faster is a GPS glitch, not a bike.
pub const MAX_REALISTIC_SPEED_KMH: f64 = 100.0;
/// Largest believable jump between consecutive fixes.
pub const MAX_GPS_JUMP_KM: f64 = 100.0;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Great-circle distance between two points, in metres.
pub fn distance_between(a: &LocationPoint, b: &LocationPoint) -> f64 {
    Haversine.distance(
        Point::new(a.longitude, a.latitude),
        Point::new(b.longitude, b.latitude),
    )
}

/// Check that a fix is usable: in range and not a zeroed-out placeholder.
pub fn is_valid_gps_coordinate(latitude: f64, longitude: f64) -> bool {
    latitude.is_finite()
        && longitude.is_finite()
        && latitude.abs() <= 90.0
        && longitude.abs() <= 180.0
        && latitude != 0.0
        && longitude != 0.0
}

/// Check a segment of `distance_km` covered in `interval_ms`.
///
/// Without a positive time interval there is nothing to check against.
pub fn is_realistic_segment(distance_km: f64, interval_ms: i64) -> bool {
    if interval_ms <= 0 {
        return true;
    }
    let hours = interval_ms as f64 / MS_PER_HOUR;
    distance_km / hours < MAX_REALISTIC_SPEED_KMH && distance_km < MAX_GPS_JUMP_KM
}

pub fn is_realistic_speed(speed_kmh: f64) -> bool {
    speed_kmh.is_finite() && (0.0..MAX_REALISTIC_SPEED_KMH).contains(&speed_kmh)
}

/// Distance in metres covered by one step of a path, or `None` if the step
/// is noise.
pub fn segment_distance(prev: &LocationPoint, curr: &LocationPoint) -> Option<f64> {
    if !is_valid_gps_coordinate(prev.latitude, prev.longitude)
        || !is_valid_gps_coordinate(curr.latitude, curr.longitude)
    {
        return None;
    }
    let meters = distance_between(prev, curr);
    is_realistic_segment(meters / 1000.0, curr.timestamp - prev.timestamp).then_some(meters)
}

/// Total distance of a path in metres with GPS noise filtered out.
pub fn total_distance(path: &[LocationPoint]) -> f64 {
    path.windows(2)
        .filter_map(|w| segment_distance(&w[0], &w[1]))
        .sum()
}

/// Max and average of the plausible, non-zero speeds reported along a path.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathSpeeds {
    pub max_speed: f64,
    pub average_speed: f64,
}

pub fn speeds_from_path(path: &[LocationPoint]) -> PathSpeeds {
    let speeds: Vec<f64> = path
        .iter()
        .filter_map(|p| p.speed)
        .filter(|&s| is_realistic_speed(s) && s > 0.0)
        .collect();

    if speeds.is_empty() {
        return PathSpeeds::default();
    }

    PathSpeeds {
        max_speed: speeds.iter().copied().fold(0.0, f64::max),
        average_speed: speeds.iter().sum::<f64>() / speeds.len() as f64,
    }
}

/// Ride figures ready for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideMetrics {
    pub duration_ms: i64,
    pub distance_meters: f64,
    pub max_speed: f64,
    pub average_speed: f64,
    pub formatted_duration: String,
    pub formatted_distance: String,
    pub formatted_max_speed: String,
    pub formatted_average_speed: String,
}

/// Compute display metrics for a ride.
///
/// Stored values win; zero values are filled in from the path. Speeds are
/// clamped to the realistic range.
pub fn process_ride(ride: &Ride, now_ms: i64) -> RideMetrics {
    let duration_ms = ride.end_time.unwrap_or(now_ms) - ride.start_time;

    let mut max_speed = ride.max_speed;
    let mut average_speed = ride.average_speed;
    let mut distance = ride.distance_traveled;

    if ride.path.len() > 1 {
        if max_speed <= 0.0 || average_speed <= 0.0 {
            let from_path = speeds_from_path(&ride.path);
            if max_speed <= 0.0 {
                max_speed = from_path.max_speed;
            }
            if average_speed <= 0.0 {
                average_speed = from_path.average_speed;
            }
        }
        if distance <= 0.0 {
            distance = total_distance(&ride.path);
        }
    }

    let max_speed = clamp_speed(max_speed);
    let average_speed = clamp_speed(average_speed);
    let distance = if distance.is_finite() {
        distance.max(0.0)
    } else {
        0.0
    };

    RideMetrics {
        duration_ms,
        distance_meters: distance,
        max_speed,
        average_speed,
        formatted_duration: format_duration(duration_ms),
        formatted_distance: format_distance(distance),
        formatted_max_speed: format_speed(max_speed),
        formatted_average_speed: format_speed(average_speed),
    }
}

fn clamp_speed(speed: f64) -> f64 {
    if speed.is_finite() {
        speed.clamp(0.0, MAX_REALISTIC_SPEED_KMH)
    } else {
        0.0
    }
}

/// "850 m", "2.35 km", "12.4 km".
pub fn format_distance(meters: f64) -> String {
    if !meters.is_finite() || meters < 0.0 {
        return "0 m".to_string();
    }
    if meters < 1000.0 {
        format!("{} m", meters.round() as i64)
    } else if meters < 10_000.0 {
        format!("{:.2} km", meters / 1000.0)
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// "7.5 km/h", "23 km/h", "99+ km/h".
pub fn format_speed(kmh: f64) -> String {
    if !kmh.is_finite() || kmh < 0.0 {
        return "0 km/h".to_string();
    }
    if kmh >= MAX_REALISTIC_SPEED_KMH {
        "99+ km/h".to_string()
    } else if kmh < 10.0 {
        format!("{:.1} km/h", kmh)
    } else {
        format!("{} km/h", kmh.round() as i64)
    }
}

/// "m:ss" below an hour, "h:mm:ss" above.
pub fn format_duration(ms: i64) -> String {
    if ms < 0 {
        return "0:00".to_string();
    }
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lng: f64, ts: i64, speed: Option<f64>) -> LocationPoint {
        LocationPoint {
            latitude: lat,
            longitude: lng,
            timestamp: ts,
            speed,
            accuracy: None,
        }
    }

    #[test]
    fn test_distance_between_known_points() {
        // Manila City Hall to Rizal Park, about 750 m apart
        let a = point(14.5896, 120.9811, 0, None);
        let b = point(14.5831, 120.9794, 0, None);
        let d = distance_between(&a, &b);
        assert!((700.0..800.0).contains(&d), "got {d}");
    }

    #[test]
    fn test_gps_validity() {
        assert!(is_valid_gps_coordinate(14.5, 121.0));
        assert!(!is_valid_gps_coordinate(0.0, 121.0));
        assert!(!is_valid_gps_coordinate(14.5, 0.0));
        assert!(!is_valid_gps_coordinate(91.0, 121.0));
        assert!(!is_valid_gps_coordinate(14.5, -181.0));
        assert!(!is_valid_gps_coordinate(f64::NAN, 121.0));
    }

    #[test]
    fn test_realistic_segment() {
        // 1 km in 6 minutes = 10 km/h
        assert!(is_realistic_segment(1.0, 360_000));
        // 10 km in 1 minute = 600 km/h
        assert!(!is_realistic_segment(10.0, 60_000));
        // no time information
        assert!(is_realistic_segment(5.0, 0));
        assert!(is_realistic_segment(5.0, -1000));
    }

    #[test]
    fn test_total_distance_skips_gps_jump() {
        let path = vec![
            point(14.5896, 120.9811, 0, None),
            point(14.5831, 120.9794, 300_000, None),
            // Jumps to Cebu one second later
            point(10.3157, 123.8854, 301_000, None),
            point(14.5800, 120.9780, 600_000, None),
        ];
        let total = total_distance(&path);
        let first_leg = distance_between(&path[0], &path[1]);
        assert!(total >= first_leg);
        assert!(total < 5_000.0, "got {total}");
    }

    #[test]
    fn test_total_distance_ignores_zero_fixes() {
        let path = vec![
            point(0.0, 0.0, 0, None),
            point(14.5896, 120.9811, 60_000, None),
        ];
        assert_eq!(total_distance(&path), 0.0);
        assert_eq!(total_distance(&path[..1]), 0.0);
    }

    #[test]
    fn test_speeds_from_path() {
        let path = vec![
            point(14.5, 121.0, 0, Some(10.0)),
            point(14.5, 121.0, 1, Some(0.0)),
            point(14.5, 121.0, 2, Some(20.0)),
            point(14.5, 121.0, 3, Some(150.0)),
            point(14.5, 121.0, 4, None),
        ];
        let speeds = speeds_from_path(&path);
        assert_eq!(speeds.max_speed, 20.0);
        assert_eq!(speeds.average_speed, 15.0);
        assert_eq!(speeds_from_path(&[]), PathSpeeds::default());
    }

    #[test]
    fn test_process_ride_uses_path_fallbacks() {
        let mut ride = crate::models::ride::tests::make_ride("r1");
        ride.start_time = 1_000_000;
        ride.end_time = Some(1_000_000 + 65 * 60_000);
        ride.path = vec![
            point(14.5896, 120.9811, 1_000_000, Some(12.0)),
            point(14.5831, 120.9794, 1_300_000, Some(18.0)),
        ];

        let metrics = process_ride(&ride, 0);
        assert_eq!(metrics.duration_ms, 65 * 60_000);
        assert_eq!(metrics.formatted_duration, "1:05:00");
        assert_eq!(metrics.max_speed, 18.0);
        assert_eq!(metrics.average_speed, 15.0);
        assert!(metrics.distance_meters > 0.0);
    }

    #[test]
    fn test_process_ride_clamps_stored_speed() {
        let mut ride = crate::models::ride::tests::make_ride("r1");
        ride.max_speed = 250.0;
        ride.average_speed = 12.0;
        let metrics = process_ride(&ride, ride.start_time + 1000);
        assert_eq!(metrics.max_speed, MAX_REALISTIC_SPEED_KMH);
        assert_eq!(metrics.formatted_max_speed, "99+ km/h");
        assert_eq!(metrics.formatted_average_speed, "12 km/h");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(-5.0), "0 m");
        assert_eq!(format_distance(850.4), "850 m");
        assert_eq!(format_distance(2346.0), "2.35 km");
        assert_eq!(format_distance(12_400.0), "12.4 km");
    }

    #[test]
    fn test_format_speed() {
        assert_eq!(format_speed(-1.0), "0 km/h");
        assert_eq!(format_speed(7.46), "7.5 km/h");
        assert_eq!(format_speed(23.4), "23 km/h");
        assert_eq!(format_speed(100.0), "99+ km/h");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(-1), "0:00");
        assert_eq!(format_duration(59_000), "0:59");
        assert_eq!(format_duration(61_000), "1:01");
        assert_eq!(format_duration(3_723_000), "1:02:03");
    }
}
