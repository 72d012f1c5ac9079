use wayfind_core::{
    Coordinate, FlowError, PathError, PipelineError, ResolvedEndpoints, RouteMode,
};
use wayfind_flow::{Outcome, Step, UserAction};
use wayfind_tests::{
    backend_response, controller, ms, scenic_route, walking_path, ScriptedExtractor,
    ScriptedPipeline, ScriptedRetriever,
};

const PARK_WALK: &str = "scenic walk from Union Square to Golden Gate Park";

fn submit(text: &str, mode: RouteMode) -> UserAction {
    UserAction::Submit {
        text: text.to_string(),
        mode,
        max_results: None,
    }
}

fn park_extractor() -> ScriptedExtractor {
    ScriptedExtractor::default().answer(
        PARK_WALK,
        ms(1),
        ResolvedEndpoints::new("Union Square", "Golden Gate Park"),
    )
}

#[tokio::test]
async fn quick_query_with_a_single_path_shows_one_route() {
    let extractor = ScriptedExtractor::default().answer(
        "scenic route via parks",
        ms(1),
        ResolvedEndpoints::new("Current Location", "Golden Gate Park, SF"),
    );
    let mut flow = controller(
        extractor,
        ScriptedRetriever::default().paths(
            "Golden Gate Park, SF",
            ms(1),
            vec![walking_path(5200.0)],
        ),
        ScriptedPipeline::default(),
    );

    let submitted = flow.dispatch(submit("scenic route via parks", RouteMode::Quick));
    assert_eq!(submitted, Outcome::Applied);
    assert_eq!(flow.state().step, Step::Processing);
    flow.settle().await;

    let state = flow.state();
    assert_eq!(state.step, Step::Routes);
    assert_eq!(state.routes.len(), 1);
    assert_eq!(state.routes[0].id, 1);
    assert_eq!(state.routes[0].title, "Recommended");
    assert_eq!(state.routes[0].detour_text(), "0%");
    assert_eq!(state.error, None);
    assert_eq!(
        state.endpoints,
        Some(ResolvedEndpoints::new("Current Location", "Golden Gate Park, SF"))
    );
    assert!(!state.is_loading());
}

#[tokio::test]
async fn quick_mode_never_calls_the_backend() {
    let pipeline = ScriptedPipeline::default();
    let backend_calls = pipeline.calls.clone();
    let mut flow = controller(
        park_extractor(),
        ScriptedRetriever::default().paths("Golden Gate Park", ms(1), vec![walking_path(5200.0)]),
        pipeline,
    );

    flow.dispatch(submit(PARK_WALK, RouteMode::Quick));
    flow.settle().await;
    assert_eq!(backend_calls.get(), 0);
}

#[tokio::test]
async fn enhanced_query_without_waypoints_asks_for_preference_keywords() {
    let extractor = park_extractor();
    let extractions = extractor.calls.clone();
    let mut flow = controller(
        extractor,
        ScriptedRetriever::default(),
        ScriptedPipeline::respond(ms(2), Err(PipelineError::NoWaypoints)),
    );

    flow.dispatch(submit("somewhere nice", RouteMode::Enhanced));
    flow.settle().await;

    let state = flow.state();
    assert_eq!(state.step, Step::Search);
    assert!(state.routes.is_empty());
    assert_eq!(
        state.error,
        Some(FlowError::Pipeline(PipelineError::NoWaypoints))
    );
    assert!(state
        .error_message()
        .is_some_and(|message| message.contains("preference keywords")));
    assert_eq!(extractions.get(), 0);
}

#[tokio::test]
async fn failed_regeneration_keeps_the_existing_list() {
    let mut flow = controller(
        park_extractor(),
        ScriptedRetriever::default()
            .paths(
                "Golden Gate Park",
                ms(1),
                vec![walking_path(5200.0), walking_path(5900.0)],
            )
            .failure(
                "Nowhere Street",
                ms(1),
                PathError::LocationNotFound("Nowhere Street".to_string()),
            ),
        ScriptedPipeline::default(),
    );

    flow.dispatch(submit(PARK_WALK, RouteMode::Quick));
    flow.settle().await;
    let before = flow.state().routes.clone();
    assert_eq!(before.len(), 2);

    flow.dispatch(UserAction::EditEndpoints {
        origin: "Union Square".to_string(),
        destination: "Nowhere Street".to_string(),
    });
    assert_eq!(flow.dispatch(UserAction::Regenerate), Outcome::Applied);
    assert!(flow.state().is_regenerating());
    flow.settle().await;

    let state = flow.state();
    assert_eq!(state.step, Step::Routes);
    assert_eq!(state.routes, before);
    assert!(state
        .error_message()
        .is_some_and(|message| message.contains("more specific address")));
    assert_eq!(flow.metrics().snapshot().regenerations, 1);
}

#[tokio::test]
async fn successful_regeneration_selects_the_first_new_route() {
    let mut flow = controller(
        park_extractor(),
        ScriptedRetriever::default()
            .paths("Golden Gate Park", ms(1), vec![walking_path(5200.0)])
            .paths(
                "Ferry Building",
                ms(1),
                vec![walking_path(1900.0), walking_path(2100.0)],
            ),
        ScriptedPipeline::default(),
    );

    flow.dispatch(submit(PARK_WALK, RouteMode::Quick));
    flow.settle().await;
    flow.dispatch(UserAction::EditEndpoints {
        origin: "Union Square".to_string(),
        destination: "Ferry Building".to_string(),
    });
    flow.dispatch(UserAction::Regenerate);
    flow.settle().await;

    let state = flow.state();
    assert_eq!(state.routes.len(), 2);
    assert_eq!(state.selected, Some(0));
    assert_eq!(
        state.endpoints,
        Some(ResolvedEndpoints::new("Union Square", "Ferry Building"))
    );
    assert_eq!(state.inline_error, None);
}

#[tokio::test]
async fn results_from_a_superseded_query_are_discarded() {
    let extractor = ScriptedExtractor::default()
        .answer(
            "walk to the park",
            ms(40),
            ResolvedEndpoints::new("Current Location", "Golden Gate Park"),
        )
        .answer(
            "walk to the pier",
            ms(1),
            ResolvedEndpoints::new("Current Location", "Pier 39"),
        );
    let retriever = ScriptedRetriever::default()
        .paths(
            "Golden Gate Park",
            ms(1),
            vec![walking_path(5200.0), walking_path(5600.0), walking_path(6100.0)],
        )
        .paths("Pier 39", ms(1), vec![walking_path(2400.0)]);
    let path_calls = retriever.calls.clone();
    let mut flow = controller(extractor, retriever, ScriptedPipeline::default());

    flow.dispatch(submit("walk to the park", RouteMode::Quick));
    flow.dispatch(submit("walk to the pier", RouteMode::Quick));
    flow.settle().await;

    let state = flow.state();
    assert_eq!(state.step, Step::Routes);
    assert_eq!(state.routes.len(), 1);
    assert_eq!(
        state.endpoints.as_ref().map(|endpoints| endpoints.destination.as_str()),
        Some("Pier 39")
    );
    // The park extraction finished late and never reached path retrieval.
    assert_eq!(path_calls.get(), 1);
    assert!(flow.metrics().snapshot().stale_results >= 1);
}

#[tokio::test]
async fn route_ids_map_to_one_based_positions() {
    let mut flow = controller(
        park_extractor(),
        ScriptedRetriever::default().paths(
            "Golden Gate Park",
            ms(1),
            vec![walking_path(5200.0), walking_path(5400.0), walking_path(6000.0)],
        ),
        ScriptedPipeline::default(),
    );
    flow.dispatch(submit(PARK_WALK, RouteMode::Quick));
    flow.settle().await;

    let titles = flow
        .state()
        .routes
        .iter()
        .map(|route| route.title.as_str())
        .collect::<Vec<_>>();
    assert_eq!(titles, ["Recommended", "Balanced Route", "Alternative 3"]);

    assert_eq!(flow.dispatch(UserAction::Select { id: 3 }), Outcome::Applied);
    assert_eq!(flow.state().selected, Some(2));
    assert_eq!(flow.state().step, Step::Detail);
    assert_eq!(flow.map_view().map(|view| view.selected_index), Some(2));

    assert_eq!(flow.dispatch(UserAction::Select { id: 4 }), Outcome::Ignored);
    assert_eq!(flow.state().selected, Some(2));
}

#[tokio::test]
async fn back_walks_the_screens_in_reverse() {
    let mut flow = controller(
        park_extractor(),
        ScriptedRetriever::default().paths("Golden Gate Park", ms(1), vec![walking_path(5200.0)]),
        ScriptedPipeline::default(),
    );
    flow.dispatch(submit(PARK_WALK, RouteMode::Quick));
    flow.settle().await;

    flow.dispatch(UserAction::Select { id: 1 });
    flow.dispatch(UserAction::StartNavigation);
    assert_eq!(flow.state().step, Step::Navigation);

    let mut steps = Vec::new();
    for _ in 0..4 {
        flow.dispatch(UserAction::Back);
        steps.push(flow.state().step);
    }
    assert_eq!(
        steps,
        [Step::Detail, Step::Routes, Step::Search, Step::Search]
    );
    assert!(flow.state().routes.is_empty());
}

#[tokio::test]
async fn going_back_while_processing_abandons_the_request() {
    let mut flow = controller(
        park_extractor(),
        ScriptedRetriever::default(),
        ScriptedPipeline::respond(
            ms(30),
            Ok(backend_response(
                vec![scenic_route(0.9, 4800.0, &[])],
                3,
            )),
        ),
    );

    flow.dispatch(submit("parks please", RouteMode::Enhanced));
    flow.dispatch(UserAction::Back);
    flow.settle().await;

    let state = flow.state();
    assert_eq!(state.step, Step::Search);
    assert!(state.routes.is_empty());
    assert_eq!(flow.metrics().snapshot().stale_results, 1);
}

#[tokio::test]
async fn editing_the_query_clears_previous_results() {
    let mut flow = controller(
        park_extractor(),
        ScriptedRetriever::default().paths("Golden Gate Park", ms(1), vec![walking_path(5200.0)]),
        ScriptedPipeline::default(),
    );
    flow.dispatch(submit(PARK_WALK, RouteMode::Quick));
    flow.settle().await;
    assert_eq!(flow.state().step, Step::Routes);

    flow.dispatch(UserAction::EditQuery {
        text: "quiet walk along the water".to_string(),
    });
    let state = flow.state();
    assert_eq!(state.step, Step::Search);
    assert!(state.routes.is_empty());
    assert_eq!(state.draft_text, "quiet walk along the water");
}

#[tokio::test]
async fn enhanced_detail_converts_stops_into_street_geometry() {
    let cafe = Coordinate::new(37.7760, -122.4330);
    let overlook = Coordinate::new(37.7710, -122.4540);
    let retriever = ScriptedRetriever::default();
    let conversions = retriever.conversions.clone();
    let mut flow = controller(
        park_extractor(),
        retriever,
        ScriptedPipeline::respond(
            ms(2),
            Ok(backend_response(
                vec![
                    scenic_route(87.0, 6100.0, &[("amenity=cafe", "cafe", cafe)]),
                    scenic_route(
                        0.74,
                        5200.0,
                        &[("Alamo Square", "park", cafe), ("", "viewpoint", overlook)],
                    ),
                ],
                5,
            )),
        ),
    );

    flow.dispatch(submit("parks and a view", RouteMode::Enhanced));
    flow.settle().await;

    let state = flow.state();
    assert_eq!(state.step, Step::Routes);
    assert_eq!(state.routes[0].title, "Most Scenic");
    assert_eq!(state.routes[0].score.percent(), 87);
    assert_eq!(state.routes[1].detour_percent, 0);
    assert_eq!(state.routes[1].waypoint_names, ["Alamo Square", "Attraction"]);
    assert_eq!(
        state.endpoints.as_ref().map(|endpoints| endpoints.origin.as_str()),
        Some("Union Square, San Francisco")
    );

    flow.dispatch(UserAction::Select { id: 2 });
    assert!(flow.state().geometry_pending);
    let straight = flow.map_view().map(|view| view.legs.len());
    assert_eq!(straight, Some(3));

    flow.settle().await;
    let view = flow.map_view().expect("selected route has a map");
    assert_eq!(view.legs.len(), 1);
    assert_eq!(view.legs[0].len(), 4);
    assert_eq!(view.waypoints.len(), 2);

    flow.dispatch(UserAction::Back);
    flow.dispatch(UserAction::Select { id: 2 });
    assert!(!flow.state().geometry_pending);
    assert_eq!(conversions.get(), 1);
}

#[tokio::test]
async fn waypoint_lists_expand_per_route() {
    let mut flow = controller(
        park_extractor(),
        ScriptedRetriever::default().paths(
            "Golden Gate Park",
            ms(1),
            vec![walking_path(5200.0), walking_path(5400.0)],
        ),
        ScriptedPipeline::default(),
    );
    flow.dispatch(submit(PARK_WALK, RouteMode::Quick));
    flow.settle().await;

    flow.dispatch(UserAction::ToggleWaypoints { id: 2 });
    assert!(flow.state().is_expanded(2));
    assert!(!flow.state().is_expanded(1));

    let snapshot = serde_json::to_value(flow.state()).unwrap();
    assert_eq!(snapshot["expanded_waypoints"], serde_json::json!([2]));
    assert_eq!(snapshot["step"], "routes");
}
