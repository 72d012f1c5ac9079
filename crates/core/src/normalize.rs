use crate::display::{build_deep_links, format_distance, format_duration};
use crate::labels::{tag_label, waypoint_display_name};
use crate::models::{
    RawBackendRoute, RawPath, RouteMode, RouteOption, RoutePayload, RoutingProfile, UnitSystem,
};
use crate::score::{Score, SubScores};

/// Raw output of either pipeline.
#[derive(Debug, Clone, Copy)]
pub enum RawRoutes<'a> {
    Paths(&'a [RawPath]),
    Backend(&'a [RawBackendRoute]),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NormalizeOptions {
    pub units: UnitSystem,
    pub profile: RoutingProfile,
}

pub fn normalize(raw: RawRoutes<'_>, options: NormalizeOptions) -> Vec<RouteOption> {
    match raw {
        RawRoutes::Paths(paths) => normalize_paths(paths, options),
        RawRoutes::Backend(routes) => normalize_backend_routes(routes, options),
    }
}

pub fn display_id(index: usize) -> usize {
    index + 1
}

/// Inverse of [`display_id`], bounded by the current list length.
pub fn index_for_id(id: usize, len: usize) -> Option<usize> {
    id.checked_sub(1).filter(|index| *index < len)
}

pub fn route_title(mode: RouteMode, index: usize) -> String {
    match (mode, index) {
        (RouteMode::Enhanced, 0) => "Most Scenic".to_string(),
        (RouteMode::Quick, 0) => "Recommended".to_string(),
        (_, 1) => "Balanced Route".to_string(),
        (_, index) => format!("Alternative {}", display_id(index)),
    }
}

/// Percentage increase of each distance over the shortest one in the set.
/// The shortest entry is always exactly zero.
pub fn detour_percentages(distances: &[f64]) -> Vec<u32> {
    let shortest = shortest_distance(distances);
    distances
        .iter()
        .map(|&distance| match shortest {
            Some(shortest) if distance.is_finite() && distance > shortest => {
                ((distance - shortest) / shortest * 100.0).round() as u32
            }
            _ => 0,
        })
        .collect()
}

fn shortest_distance(distances: &[f64]) -> Option<f64> {
    distances
        .iter()
        .copied()
        .filter(|distance| distance.is_finite() && *distance > 0.0)
        .reduce(f64::min)
}

fn position_of_min(values: impl Iterator<Item = f64>) -> Option<usize> {
    values
        .enumerate()
        .filter(|(_, value)| value.is_finite())
        .fold(None, |best: Option<(usize, f64)>, (index, value)| match best {
            Some((_, current)) if current <= value => best,
            _ => Some((index, value)),
        })
        .map(|(index, _)| index)
}

pub fn normalize_paths(paths: &[RawPath], options: NormalizeOptions) -> Vec<RouteOption> {
    let distances = paths.iter().map(|path| path.distance_m).collect::<Vec<_>>();
    let detours = detour_percentages(&distances);
    let shortest = shortest_distance(&distances);
    let shortest_index = position_of_min(distances.iter().copied());
    let fastest_index = position_of_min(paths.iter().map(|path| path.duration_s));

    paths
        .iter()
        .zip(detours)
        .enumerate()
        .map(|(index, (path, detour_percent))| {
            let efficiency = match shortest {
                Some(shortest) if path.distance_m > 0.0 => Score::from_unit(shortest / path.distance_m),
                _ => Score::FULL,
            };

            let mut tags = Vec::new();
            if shortest_index == Some(index) {
                tags.push(tag_label("shortest"));
            }
            if fastest_index == Some(index) {
                tags.push(tag_label("fastest"));
            }

            let via = path.via_points();
            let links = match (path.origin, path.destination) {
                (Some(origin), Some(destination)) => {
                    build_deep_links(origin, &[], destination, options.profile)
                }
                _ => None,
            };

            RouteOption {
                id: display_id(index),
                title: route_title(RouteMode::Quick, index),
                score: efficiency,
                sub_scores: SubScores {
                    efficiency: Some(efficiency),
                    ..SubScores::default()
                },
                duration_text: format_duration(path.duration_s),
                distance_text: format_distance(path.distance_m, options.units),
                detour_percent,
                tags,
                narrative: via_narrative(&via),
                waypoint_names: via,
                links,
                payload: RoutePayload::Path(path.clone()),
            }
        })
        .collect()
}

pub fn normalize_backend_routes(
    routes: &[RawBackendRoute],
    options: NormalizeOptions,
) -> Vec<RouteOption> {
    let distances = routes.iter().map(|route| route.distance_m).collect::<Vec<_>>();
    let detours = detour_percentages(&distances);

    routes
        .iter()
        .zip(detours)
        .enumerate()
        .map(|(index, (route, detour_percent))| {
            let waypoint_names = route
                .waypoints
                .iter()
                .map(|waypoint| waypoint_display_name(&waypoint.name, &waypoint.category))
                .collect::<Vec<_>>();

            let narrative = route
                .explanation
                .as_deref()
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(ToString::to_string)
                .unwrap_or_else(|| stops_narrative(&waypoint_names));

            let links = route
                .links
                .clone()
                .filter(|links| !links.is_empty())
                .or_else(|| {
                    let stops = route
                        .waypoints
                        .iter()
                        .map(|waypoint| waypoint.coordinates)
                        .collect::<Vec<_>>();
                    build_deep_links(route.origin, &stops, route.destination, options.profile)
                });

            RouteOption {
                id: display_id(index),
                title: route_title(RouteMode::Enhanced, index),
                score: Score::ingest(route.score),
                sub_scores: SubScores::from_raw(&route.scores),
                duration_text: format_duration(route.duration_s),
                distance_text: format_distance(route.distance_m, options.units),
                detour_percent,
                tags: backend_tags(route),
                narrative,
                waypoint_names,
                links,
                payload: RoutePayload::Backend(route.clone()),
            }
        })
        .collect()
}

fn backend_tags(route: &RawBackendRoute) -> Vec<String> {
    let raw_tags = if route.tags.is_empty() {
        route
            .waypoints
            .iter()
            .filter_map(|waypoint| {
                waypoint
                    .input_query
                    .as_deref()
                    .filter(|query| !query.trim().is_empty())
                    .or(Some(waypoint.category.as_str()))
                    .filter(|tag| !tag.trim().is_empty())
            })
            .map(ToString::to_string)
            .collect::<Vec<_>>()
    } else {
        route.tags.clone()
    };

    let mut labels = Vec::<String>::new();
    for tag in raw_tags {
        let label = tag_label(&tag);
        if !labels.contains(&label) {
            labels.push(label);
        }
    }
    labels
}

fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [rest @ .., last] => format!("{} and {}", rest.join(", "), last),
    }
}

fn via_narrative(via: &[String]) -> String {
    if via.is_empty() {
        "Direct route.".to_string()
    } else {
        format!("Via {}.", join_names(via))
    }
}

fn stops_narrative(names: &[String]) -> String {
    if names.is_empty() {
        "Direct route with no scenic stops.".to_string()
    } else {
        format!("Passes {}.", join_names(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BackendWaypoint, Coordinate, DeepLinks, RawLeg, RawSubScores};

    fn path(distance_m: f64, duration_s: f64, via: &[&str]) -> RawPath {
        RawPath {
            distance_m,
            duration_s,
            legs: vec![RawLeg {
                distance_m,
                duration_s,
                geometry: Vec::new(),
                via: via.iter().map(|name| name.to_string()).collect(),
            }],
            origin: Some(Coordinate::new(37.78, -122.41)),
            destination: Some(Coordinate::new(37.77, -122.45)),
            ..RawPath::default()
        }
    }

    fn backend_route(score: f64, distance_m: f64, names: &[&str]) -> RawBackendRoute {
        RawBackendRoute {
            id: None,
            score,
            scores: RawSubScores {
                scenic: Some(score),
                ..RawSubScores::default()
            },
            distance_m,
            duration_s: distance_m / 1.3,
            origin: Coordinate::new(37.78, -122.41),
            destination: Coordinate::new(37.77, -122.45),
            waypoints: names
                .iter()
                .enumerate()
                .map(|(offset, name)| BackendWaypoint {
                    name: name.to_string(),
                    category: "leisure=park".to_string(),
                    relevance_score: Some(0.8),
                    input_query: Some("leisure=park".to_string()),
                    coordinates: Coordinate::new(37.775, -122.42 - offset as f64 * 0.01),
                })
                .collect(),
            segments: Vec::new(),
            tags: Vec::new(),
            explanation: None,
            links: None,
        }
    }

    #[test]
    fn shortest_route_has_exactly_zero_detour() {
        let detours = detour_percentages(&[2400.0, 2000.0, 2000.0000001, 3100.0]);
        assert_eq!(detours, vec![20, 0, 0, 55]);
    }

    #[test]
    fn degenerate_distances_never_go_negative() {
        assert_eq!(detour_percentages(&[0.0, f64::NAN, 10.0]), vec![0, 0, 0]);
        assert!(detour_percentages(&[]).is_empty());
    }

    #[test]
    fn titles_follow_rank() {
        assert_eq!(route_title(RouteMode::Enhanced, 0), "Most Scenic");
        assert_eq!(route_title(RouteMode::Quick, 0), "Recommended");
        assert_eq!(route_title(RouteMode::Enhanced, 1), "Balanced Route");
        assert_eq!(route_title(RouteMode::Enhanced, 2), "Alternative 3");
        assert_eq!(route_title(RouteMode::Quick, 4), "Alternative 5");
    }

    #[test]
    fn ids_and_indexes_round_trip() {
        for index in 0..6 {
            assert_eq!(index_for_id(display_id(index), 6), Some(index));
        }
        assert_eq!(index_for_id(0, 6), None);
        assert_eq!(index_for_id(7, 6), None);
    }

    #[test]
    fn single_quick_path_is_recommended_with_zero_detour() {
        let options = normalize_paths(
            &[path(4200.0, 3100.0, &["JFK Drive"])],
            NormalizeOptions::default(),
        );
        assert_eq!(options.len(), 1);
        assert_eq!(options[0].title, "Recommended");
        assert_eq!(options[0].detour_text(), "0%");
        assert_eq!(options[0].tags, vec!["Shortest", "Fastest"]);
        assert_eq!(options[0].narrative, "Via JFK Drive.");
        assert_eq!(options[0].score, Score::FULL);
    }

    #[test]
    fn quick_alternatives_score_by_efficiency() {
        let options = normalize_paths(
            &[path(2000.0, 1500.0, &[]), path(2500.0, 1400.0, &["Fell Street", "Oak Street"])],
            NormalizeOptions::default(),
        );
        assert_eq!(options[1].detour_text(), "25%");
        assert_eq!(options[1].score.percent(), 80);
        assert_eq!(options[0].tags, vec!["Shortest"]);
        assert_eq!(options[1].tags, vec!["Fastest"]);
        assert_eq!(options[1].narrative, "Via Fell Street and Oak Street.");
        assert!(options[1].links.is_some());
    }

    #[test]
    fn backend_routes_keep_rank_order_and_count() {
        let routes = vec![
            backend_route(0.91, 3000.0, &["Alamo Square"]),
            backend_route(78.0, 2500.0, &["leisure=park (node 7)"]),
            backend_route(0.5, 2600.0, &[]),
        ];
        let options = normalize_backend_routes(&routes, NormalizeOptions::default());

        assert_eq!(options.len(), routes.len());
        assert_eq!(
            options.iter().map(|option| option.title.as_str()).collect::<Vec<_>>(),
            vec!["Most Scenic", "Balanced Route", "Alternative 3"]
        );
        assert_eq!(options[0].score.percent(), 91);
        assert_eq!(options[1].score.percent(), 78);
        assert_eq!(options[1].detour_text(), "0%");
        assert_eq!(options[0].detour_text(), "20%");
        assert_eq!(options[1].waypoint_names, vec!["Park"]);
        assert_eq!(options[0].tags, vec!["Parks & gardens"]);
        assert_eq!(options[2].narrative, "Direct route with no scenic stops.");
        for (index, option) in options.iter().enumerate() {
            assert_eq!(option.id, index + 1);
            assert!(option.backend_route().is_some());
        }
    }

    #[test]
    fn backend_explanation_and_links_win() {
        let mut route = backend_route(0.7, 1000.0, &["Dolores Park"]);
        route.explanation = Some("  Sunny hilltop views.  ".to_string());
        route.links = Some(DeepLinks {
            google_maps: Some("https://maps.example/abc".to_string()),
            apple_maps: None,
        });
        route.tags = vec!["scenic".to_string(), "Scenery".to_string(), "craft=brewery".to_string()];

        let options = normalize_backend_routes(&[route], NormalizeOptions::default());
        assert_eq!(options[0].narrative, "Sunny hilltop views.");
        assert_eq!(
            options[0].links.as_ref().and_then(|links| links.google_maps.as_deref()),
            Some("https://maps.example/abc")
        );
        assert_eq!(options[0].tags, vec!["Scenic", "craft=brewery"]);
    }
}
