use unicode_segmentation::UnicodeSegmentation;
use url::Url;

use crate::models::{Coordinate, DeepLinks, RoutingProfile, UnitSystem};

const METERS_PER_MILE: f64 = 1609.344;

pub fn format_duration(seconds: f64) -> String {
    let minutes = (seconds.max(0.0) / 60.0).round() as u64;
    if minutes < 60 {
        return format!("{} min", minutes.max(1));
    }
    let hours = minutes / 60;
    match minutes % 60 {
        0 => format!("{hours} h"),
        rest => format!("{hours} h {rest} min"),
    }
}

pub fn format_distance(meters: f64, units: UnitSystem) -> String {
    let meters = meters.max(0.0);
    match units {
        UnitSystem::Imperial => format!("{:.1} mi", meters / METERS_PER_MILE),
        UnitSystem::Metric if meters < 1000.0 => format!("{} m", meters.round() as u64),
        UnitSystem::Metric => format!("{:.1} km", meters / 1000.0),
    }
}

/// Cuts `text` to at most `max` graphemes, appending an ellipsis when shortened.
pub fn excerpt(text: &str, max: usize) -> String {
    let graphemes = text.trim().graphemes(true).collect::<Vec<_>>();
    if graphemes.len() <= max {
        return graphemes.concat();
    }
    let cut = graphemes[..max.saturating_sub(1)].concat();
    format!("{}…", cut.trim_end())
}

fn lat_lon(point: Coordinate) -> String {
    format!("{:.6},{:.6}", point.lat, point.lon)
}

pub fn build_deep_links(
    origin: Coordinate,
    waypoints: &[Coordinate],
    destination: Coordinate,
    profile: RoutingProfile,
) -> Option<DeepLinks> {
    let mut google_params = vec![
        ("api", "1".to_string()),
        ("origin", lat_lon(origin)),
        ("destination", lat_lon(destination)),
        ("travelmode", profile.google_travel_mode().to_string()),
    ];
    if !waypoints.is_empty() {
        let joined = waypoints
            .iter()
            .map(|point| lat_lon(*point))
            .collect::<Vec<_>>()
            .join("|");
        google_params.push(("waypoints", joined));
    }

    let google = Url::parse_with_params("https://www.google.com/maps/dir/", &google_params).ok()?;
    let apple = Url::parse_with_params(
        "https://maps.apple.com/",
        &[
            ("saddr", lat_lon(origin)),
            ("daddr", lat_lon(destination)),
            ("dirflg", profile.apple_dirflg().to_string()),
        ],
    )
    .ok()?;

    Some(DeepLinks {
        google_maps: Some(google.to_string()),
        apple_maps: Some(apple.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_switch_to_hours() {
        assert_eq!(format_duration(20.0), "1 min");
        assert_eq!(format_duration(1830.0), "31 min");
        assert_eq!(format_duration(3600.0), "1 h");
        assert_eq!(format_duration(5700.0), "1 h 35 min");
    }

    #[test]
    fn distances_follow_units() {
        assert_eq!(format_distance(2450.0, UnitSystem::Imperial), "1.5 mi");
        assert_eq!(format_distance(640.4, UnitSystem::Metric), "640 m");
        assert_eq!(format_distance(2600.0, UnitSystem::Metric), "2.6 km");
    }

    #[test]
    fn excerpt_respects_graphemes() {
        assert_eq!(excerpt("short", 10), "short");
        assert_eq!(excerpt("Passes the café and the pier", 10), "Passes th…");
        let flags = "🇺🇸🇫🇷🇩🇪";
        assert_eq!(excerpt(flags, 2), "🇺🇸…");
    }

    #[test]
    fn deep_links_include_waypoints() {
        let links = build_deep_links(
            Coordinate::new(37.7879, -122.4075),
            &[Coordinate::new(37.7948, -122.4058)],
            Coordinate::new(37.7941, -122.4078),
            RoutingProfile::Walking,
        )
        .unwrap();
        let google = links.google_maps.unwrap();
        assert!(google.starts_with("https://www.google.com/maps/dir/?api=1"));
        assert!(google.contains("travelmode=walking"));
        assert!(google.contains("waypoints=37.794800%2C-122.405800"));
        assert!(links.apple_maps.unwrap().contains("dirflg=w"));
    }
}
