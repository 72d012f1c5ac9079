use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use wayfind_clients::{
    ClientConfig, HttpRoutePipeline, LocationExtractor, MapboxRetriever, OpenAiExtractor,
    RoutePipeline,
};
use wayfind_core::query::preference_keywords;
use wayfind_core::display::excerpt;
use wayfind_core::{FlowError, PipelineError, RouteMode, RouteOption, RouteQuery};
use wayfind_flow::{FlowController, FlowState, FlowTimings, Outcome, Step, UserAction};
use wayfind_observability::{init_tracing, FlowMetrics};

const NARRATIVE_EXCERPT: usize = 140;

type Controller = FlowController<OpenAiExtractor, MapboxRetriever, HttpRoutePipeline>;

#[derive(Debug, Parser)]
#[command(name = "wayfind")]
#[command(about = "Find walking routes from a plain-language request")]
struct Cli {
    /// Skip the pauses between loading screens.
    #[arg(long, env = "WAYFIND_NO_DELAY")]
    no_delay: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run one request and print the resulting routes.
    Route {
        text: String,
        #[arg(long, default_value = "quick", value_parser = parse_mode)]
        mode: RouteMode,
        #[arg(long, default_value_t = RouteQuery::DEFAULT_MAX_RESULTS)]
        max_results: usize,
        /// Show the detail view for this route id.
        #[arg(long)]
        select: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Line-based session; type `:help` for commands.
    Interactive {
        #[arg(long, default_value = "quick", value_parser = parse_mode)]
        mode: RouteMode,
        #[arg(long, default_value_t = RouteQuery::DEFAULT_MAX_RESULTS)]
        max_results: usize,
    },
    /// Check the route generation backend.
    Health,
    /// Show the origin and destination understood from a request.
    Extract { text: String },
}

fn parse_mode(value: &str) -> Result<RouteMode, String> {
    RouteMode::parse(value)
        .ok_or_else(|| format!("unknown mode {value:?}, expected quick or enhanced"))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("wayfind");
    let cli = Cli::parse();
    let config = ClientConfig::from_env();
    let timings = if cli.no_delay {
        FlowTimings::immediate()
    } else {
        FlowTimings::default()
    };

    match cli.command {
        Command::Route {
            text,
            mode,
            max_results,
            select,
            json,
        } => {
            let controller = build_controller(&config, timings)?;
            run_route(controller, text, mode, max_results, select, json).await?
        }
        Command::Interactive { mode, max_results } => {
            let controller = build_controller(&config, timings)?;
            run_interactive(controller, mode, max_results).await?
        }
        Command::Health => {
            let pipeline = HttpRoutePipeline::from_config(&config)?;
            let health = pipeline
                .health()
                .await
                .with_context(|| format!("backend at {} is unreachable", config.backend_url))?;
            println!("{}", serde_json::to_string_pretty(&health)?);
            if !health.is_healthy() {
                bail!("backend reported status {}", health.status);
            }
        }
        Command::Extract { text } => {
            let extractor = OpenAiExtractor::from_config(&config)?;
            let endpoints = extractor
                .extract(&text)
                .await
                .map_err(FlowError::from)
                .map_err(|err| anyhow::anyhow!(err.user_message()))?;
            println!("{}", serde_json::to_string_pretty(&endpoints)?);
        }
    }

    Ok(())
}

fn build_controller(config: &ClientConfig, timings: FlowTimings) -> Result<Controller> {
    let extractor = OpenAiExtractor::from_config(config)?;
    let retriever = MapboxRetriever::from_config(config)?;
    let pipeline = HttpRoutePipeline::from_config(config)?;
    info!(
        backend = %config.backend_url,
        profile = ?config.profile,
        units = ?config.units,
        "route flow ready"
    );
    Ok(
        FlowController::new(extractor, retriever, pipeline, timings, FlowMetrics::shared())
            .with_normalize_options(config.normalize_options()),
    )
}

async fn run_route(
    mut controller: Controller,
    text: String,
    mode: RouteMode,
    max_results: usize,
    select: Option<usize>,
    json: bool,
) -> Result<()> {
    controller.dispatch(UserAction::Submit {
        text,
        mode,
        max_results: Some(max_results),
    });
    controller.settle().await;

    if let Some(error) = &controller.state().error {
        print_error(controller.state(), error);
        bail!("no routes found");
    }

    if let Some(id) = select {
        if controller.dispatch(UserAction::Select { id }) != Outcome::Applied {
            bail!("route {id} does not exist");
        }
        controller.settle().await;
    }

    if json {
        let state = controller.state();
        let payload = serde_json::json!({
            "generated_at": Utc::now().to_rfc3339(),
            "query": state.query,
            "endpoints": state.endpoints,
            "routes": state.routes,
            "selected": state.selected,
            "map": controller.map_view(),
            "metadata": state.backend_metadata,
            "metrics": controller.metrics().snapshot(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        render(controller.state());
    }
    Ok(())
}

async fn run_interactive(
    mut controller: Controller,
    mode: RouteMode,
    max_results: usize,
) -> Result<()> {
    let mut mode = mode;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_view = None;

    println!("wayfind interactive ({} mode). type :help for commands.", mode.as_str());

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match parse_line(line.trim()) {
                    Line::Quit => break,
                    Line::Help => print_help(),
                    Line::Empty => {}
                    Line::Mode(next) => {
                        mode = next;
                        println!("mode: {}", mode.as_str());
                    }
                    Line::Query(text) => {
                        controller.dispatch(UserAction::EditQuery { text: text.clone() });
                        controller.dispatch(UserAction::Submit {
                            text,
                            mode,
                            max_results: Some(max_results),
                        });
                    }
                    Line::Action(action) => {
                        if controller.dispatch(action) == Outcome::Ignored {
                            let step = controller.state().step.as_str();
                            println!("(nothing to do on the {step} screen)");
                        }
                    }
                    Line::Invalid(message) => println!("{message}"),
                }
            }
            Some(outcome) = controller.next_event(), if controller.has_pending() => {
                if outcome != Outcome::Applied {
                    continue;
                }
            }
        }

        let view = ViewKey::of(controller.state());
        if last_view.as_ref() != Some(&view) {
            render(controller.state());
            last_view = Some(view);
        }
    }

    let snapshot = controller.metrics().snapshot();
    info!(
        queries = snapshot.queries_submitted,
        calls = snapshot.pipeline_calls,
        stale = snapshot.stale_results,
        "session finished"
    );
    Ok(())
}

#[derive(Debug, PartialEq)]
enum Line {
    Empty,
    Quit,
    Help,
    Mode(RouteMode),
    Query(String),
    Action(UserAction),
    Invalid(String),
}

fn parse_line(line: &str) -> Line {
    if line.is_empty() {
        return Line::Empty;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Line::Quit;
    }
    let Some(command) = line.strip_prefix(':') else {
        return Line::Query(line.to_string());
    };

    let (name, rest) = command
        .split_once(char::is_whitespace)
        .map(|(name, rest)| (name, rest.trim()))
        .unwrap_or((command, ""));
    let id = || rest.parse::<usize>().map_err(|_| format!("expected a route id, got {rest:?}"));

    let parsed = match name {
        "q" | "quit" => Ok(Line::Quit),
        "help" => Ok(Line::Help),
        "mode" => RouteMode::parse(rest)
            .map(Line::Mode)
            .ok_or_else(|| format!("unknown mode {rest:?}")),
        "select" => id().map(|id| Line::Action(UserAction::Select { id })),
        "toggle" => id().map(|id| Line::Action(UserAction::ToggleWaypoints { id })),
        "go" => Ok(Line::Action(UserAction::StartNavigation)),
        "back" => Ok(Line::Action(UserAction::Back)),
        "regen" => Ok(Line::Action(UserAction::Regenerate)),
        "edit" => match rest.split_once("->") {
            Some((origin, destination)) if !destination.trim().is_empty() => {
                Ok(Line::Action(UserAction::EditEndpoints {
                    origin: origin.trim().to_string(),
                    destination: destination.trim().to_string(),
                }))
            }
            _ => Err("usage: :edit <origin> -> <destination>".to_string()),
        },
        other => Err(format!("unknown command :{other}")),
    };
    parsed.unwrap_or_else(Line::Invalid)
}

fn print_help() {
    println!(
        "\
  <text>                      find routes for a request
  :mode quick|enhanced        switch pipeline for the next request
  :select <id>                open a route
  :toggle <id>                show or hide a route's stops
  :go                         start navigation for the open route
  :back                       go back one screen
  :edit <origin> -> <dest>    change endpoints on the route list
  :regen                      recompute routes for edited endpoints
  :quit"
    );
}

/// Fields whose change warrants redrawing the screen.
#[derive(Debug, PartialEq)]
struct ViewKey {
    step: Step,
    token: u64,
    routes: usize,
    selected: Option<usize>,
    expanded: usize,
    geometry: bool,
    regenerating: bool,
    inline_error: bool,
}

impl ViewKey {
    fn of(state: &FlowState) -> Self {
        Self {
            step: state.step,
            token: state.token.0,
            routes: state.routes.len(),
            selected: state.selected,
            expanded: state.expanded_waypoints.len(),
            geometry: state.converted_geometry.is_some(),
            regenerating: state.is_regenerating(),
            inline_error: state.inline_error.is_some(),
        }
    }
}

fn render(state: &FlowState) {
    match state.step {
        Step::Search => {
            if let Some(error) = &state.error {
                print_error(state, error);
            }
        }
        Step::Processing => match (&state.error, state.query.as_ref().map(|query| query.mode)) {
            (Some(error), _) => print_error(state, error),
            (None, Some(RouteMode::Enhanced)) => {
                println!("Generating scenic routes. This can take a few minutes...")
            }
            (None, _) => println!("Finding routes..."),
        },
        Step::Thinking => println!("Comparing {} routes...", state.routes.len()),
        Step::Routes => print_routes(state),
        Step::Detail => {
            if let Some(route) = state.selected_route() {
                print_detail(state, route);
            }
        }
        Step::Navigation => {
            if let Some(route) = state.selected_route() {
                println!(
                    "Navigating: {} ({}, {})",
                    route.title, route.duration_text, route.distance_text
                );
                let link = route.links.as_ref().and_then(|links| links.google_maps.as_ref());
                if let Some(link) = link {
                    println!("  open in maps: {link}");
                }
            }
        }
    }
}

fn print_error(state: &FlowState, error: &FlowError) {
    println!("{}", error.user_message());
    if *error == FlowError::Pipeline(PipelineError::NoWaypoints) {
        let matched = state
            .query
            .as_ref()
            .map(|query| preference_keywords(&query.text))
            .unwrap_or_default();
        if matched.is_empty() {
            println!("  hint: your request names no place preferences");
        } else {
            println!("  hint: nothing nearby matched {}", matched.join(", "));
        }
    }
}

fn print_routes(state: &FlowState) {
    if let Some(endpoints) = &state.endpoints {
        println!("{} -> {}", endpoints.origin, endpoints.destination);
    }
    if state.is_regenerating() {
        println!("(updating routes...)");
    }
    if let Some(error) = &state.inline_error {
        println!("! {}", error.user_message());
    }
    for route in &state.routes {
        print_card(route, state.is_expanded(route.id));
    }
}

fn print_card(route: &RouteOption, expanded: bool) {
    println!(
        "[{}] {}  {} {}",
        route.id,
        route.title,
        route.score.star_text(),
        route.score.percent_text()
    );
    println!(
        "    {} · {} · +{} detour",
        route.duration_text,
        route.distance_text,
        route.detour_text()
    );
    if !route.tags.is_empty() {
        println!("    {}", route.tags.join(", "));
    }
    println!("    {}", excerpt(&route.narrative, NARRATIVE_EXCERPT));
    if expanded {
        for name in &route.waypoint_names {
            println!("      - {name}");
        }
    } else if !route.waypoint_names.is_empty() {
        println!("      {} stops (:toggle {})", route.waypoint_names.len(), route.id);
    }
}

fn print_detail(state: &FlowState, route: &RouteOption) {
    println!("{}  {}", route.title, route.score.out_of_ten_text());
    println!("{} · {}", route.duration_text, route.distance_text);
    for (label, score) in route.sub_scores.labelled() {
        println!("  {label:<12} {}", score.percent_text());
    }
    println!("{}", route.narrative);
    for name in &route.waypoint_names {
        println!("  - {name}");
    }
    if state.geometry_pending {
        println!("(loading street geometry...)");
    }
    if let Some(links) = &route.links {
        for link in [&links.google_maps, &links.apple_maps].into_iter().flatten() {
            println!("  {link}");
        }
    }
}
