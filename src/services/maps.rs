// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! GeoJSON layers for the fleet map and encoded ride paths.

use crate::error::AppError;
use crate::models::bike::is_valid_coordinate;
use crate::models::{Bike, LocationPoint, Ride};
use crate::services::ride_metrics::is_valid_gps_coordinate;
use geo::LineString;
use geojson::{feature::Id, Feature, FeatureCollection, Geometry, Value};
use serde_json::json;

fn feature(id: String, value: Value, properties: serde_json::Value) -> Feature {
    let properties = match properties {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    };
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: Some(Id::String(id)),
        properties,
        foreign_members: None,
    }
}

fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

fn position(point: &LocationPoint) -> Vec<f64> {
    vec![point.longitude, point.latitude]
}

fn valid_points(path: &[LocationPoint]) -> impl Iterator<Item = &LocationPoint> {
    path.iter()
        .filter(|p| is_valid_gps_coordinate(p.latitude, p.longitude))
}

/// Point feature per bike that can be placed on the map.
pub fn bikes_layer(bikes: &[Bike]) -> FeatureCollection {
    let features = bikes
        .iter()
        .filter(|b| is_valid_coordinate(b.latitude, b.longitude))
        .map(|bike| {
            feature(
                bike.id.clone(),
                Value::Point(vec![bike.longitude, bike.latitude]),
                json!({
                    "kind": "bike",
                    "name": bike.name,
                    "type": bike.bike_type,
                    "status": bike.status(),
                    "battery": bike.battery_level,
                    "locked": bike.is_locked,
                    "maintenanceStatus": bike.maintenance_status,
                }),
            )
        })
        .collect();
    collection(features)
}

/// Current position of each live ride plus its trail.
///
/// Trails need at least two valid fixes. Rides with no usable position at all
/// are left off the map.
pub fn rides_layer(rides: &[Ride]) -> FeatureCollection {
    let mut features = Vec::new();

    for ride in rides {
        let current = ride
            .current_location
            .as_ref()
            .filter(|p| is_valid_gps_coordinate(p.latitude, p.longitude))
            .or_else(|| valid_points(&ride.path).last());

        if let Some(point) = current {
            features.push(feature(
                ride.id.clone(),
                Value::Point(position(point)),
                json!({
                    "kind": "ride",
                    "bikeId": ride.bike_id,
                    "userId": ride.user_id,
                    "status": ride.status,
                    "startTime": ride.start_time,
                    "lastUpdate": point.timestamp,
                }),
            ));
        }

        let trail: Vec<Vec<f64>> = valid_points(&ride.path).map(position).collect();
        if trail.len() >= 2 {
            features.push(feature(
                format!("{}-trail", ride.id),
                Value::LineString(trail),
                json!({
                    "kind": "trail",
                    "rideId": ride.id,
                    "status": ride.status,
                }),
            ));
        }
    }

    collection(features)
}

/// Encoded polyline (precision 5) of a ride's valid fixes.
pub fn encode_path(path: &[LocationPoint]) -> Result<String, AppError> {
    let line: LineString<f64> = valid_points(path)
        .map(|p| (p.longitude, p.latitude))
        .collect::<Vec<_>>()
        .into();
    polyline::encode_coordinates(line, 5)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode path: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::bike::tests::make_bike;
    use crate::models::ride::tests::make_ride;
    use geojson::JsonObject;

    fn properties(feature: &Feature) -> &JsonObject {
        feature.properties.as_ref().unwrap()
    }

    #[test]
    fn test_bikes_layer_skips_invalid_coordinates() {
        let good = make_bike("b1");
        let mut bad = make_bike("b2");
        bad.latitude = f64::NAN;

        let layer = bikes_layer(&[good, bad]);
        assert_eq!(layer.features.len(), 1);

        let feature = &layer.features[0];
        assert_eq!(feature.id, Some(Id::String("b1".to_string())));
        let props = properties(feature);
        assert_eq!(props["status"], "available");
        assert_eq!(props["locked"], true);
        assert_eq!(props["battery"], 100);
    }

    #[test]
    fn test_rides_layer_needs_two_points_for_trail() {
        let mut short = make_ride("r1");
        short.path.truncate(1);

        let mut long = make_ride("r2");
        let start = long.start_location.clone();
        long.path.push(LocationPoint::at(
            start.latitude + 0.001,
            start.longitude,
            long.start_time + 10_000,
        ));
        // A zeroed fix is ignored
        long.path.push(LocationPoint::at(0.0, 0.0, long.start_time + 20_000));

        let layer = rides_layer(&[short, long]);
        let kinds: Vec<&str> = layer
            .features
            .iter()
            .map(|f| properties(f)["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, ["ride", "ride", "trail"]);

        match &layer.features[2].geometry.as_ref().unwrap().value {
            Value::LineString(coords) => assert_eq!(coords.len(), 2),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_encode_path() {
        let path = vec![
            LocationPoint::at(38.5, -120.2, 0),
            LocationPoint::at(40.7, -120.95, 1),
            LocationPoint::at(43.252, -126.453, 2),
        ];
        assert_eq!(encode_path(&path).unwrap(), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn test_encode_empty_path() {
        assert_eq!(encode_path(&[]).unwrap(), "");
    }
}
