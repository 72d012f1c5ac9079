use serde::Serialize;
use wayfind_core::{Coordinate, RawPath, RouteOption, RoutePayload};

use crate::state::FlowState;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapWaypoint {
    pub name: String,
    pub position: Coordinate,
}

/// What a map surface should draw for the selected route.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapView {
    pub selected_index: usize,
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
    pub waypoints: Vec<MapWaypoint>,
    /// One polyline per leg, in travel order.
    pub legs: Vec<Vec<Coordinate>>,
}

/// Derives the map for the current selection, preferring converted
/// street geometry over straight lines between backend stops.
pub fn map_view(state: &FlowState) -> Option<MapView> {
    let index = state.selected?;
    let route = state.routes.get(index)?;
    let converted = state
        .converted_geometry
        .as_ref()
        .filter(|(converted, _)| *converted == index)
        .map(|(_, path)| path);

    Some(match &route.payload {
        RoutePayload::Path(path) => MapView {
            selected_index: index,
            origin: path.origin,
            destination: path.destination,
            waypoints: Vec::new(),
            legs: path_legs(path),
        },
        RoutePayload::Backend(backend) => {
            let waypoints = backend
                .waypoints
                .iter()
                .zip(&route.waypoint_names)
                .map(|(waypoint, name)| MapWaypoint {
                    name: name.clone(),
                    position: waypoint.coordinates,
                })
                .collect();
            let legs = match converted {
                Some(path) => path_legs(path),
                None => straight_legs(route),
            };
            MapView {
                selected_index: index,
                origin: Some(backend.origin),
                destination: Some(backend.destination),
                waypoints,
                legs,
            }
        }
    })
}

fn path_legs(path: &RawPath) -> Vec<Vec<Coordinate>> {
    let legs = path
        .legs
        .iter()
        .filter(|leg| leg.geometry.len() >= 2)
        .map(|leg| leg.geometry.clone())
        .collect::<Vec<_>>();
    if !legs.is_empty() {
        return legs;
    }
    if path.geometry.len() >= 2 {
        vec![path.geometry.clone()]
    } else {
        Vec::new()
    }
}

fn straight_legs(route: &RouteOption) -> Vec<Vec<Coordinate>> {
    let Some(backend) = route.backend_route() else {
        return Vec::new();
    };
    backend
        .stops()
        .windows(2)
        .map(|pair| pair.to_vec())
        .collect()
}
