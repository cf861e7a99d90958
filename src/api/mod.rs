use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::core::{
    Histogram, SimulationError, SimulationParameters, SummaryStatistics, histogram, percentile,
    run_simulation_seeded, summarize,
};

mod report;

pub use report::render_text_report;

const INDEX_HTML: &str = include_str!("../../web/index.html");
const STYLES_CSS: &str = include_str!("../../web/styles.css");
const APP_JS: &str = include_str!("../../web/app.js");

const MAX_SIMULATIONS: f64 = 200_000.0;
const MAX_MONTHS: f64 = 1_200.0;
const MAX_TOTAL_DRAWS: f64 = 50_000_000.0;
const MAX_BINS: usize = 200;
const MAX_RATE_PERCENT: f64 = 1_000.0;
// Largest seed a JSON number carries exactly through a JS client.
const MAX_SEED: u64 = (1 << 53) - 1;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct SimulatePayload {
    mean_return: Option<f64>,
    volatility: Option<f64>,
    starting_wealth: Option<f64>,
    months: Option<f64>,
    simulations: Option<f64>,
    seed: Option<u64>,
    bins: Option<usize>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "growthsim",
    about = "Monte Carlo simulation of compounding monthly investment returns"
)]
pub struct Cli {
    #[arg(
        long,
        default_value_t = 3.78,
        allow_negative_numbers = true,
        help = "Expected monthly return in percent"
    )]
    mean_return: f64,
    #[arg(long, default_value_t = 7.61, help = "Monthly volatility in percent")]
    volatility: f64,
    #[arg(long, default_value_t = 10_000.0)]
    starting_wealth: f64,
    #[arg(
        long,
        default_value_t = 12.0,
        allow_negative_numbers = true,
        help = "Number of months; fractional values are truncated"
    )]
    months: f64,
    #[arg(
        long,
        default_value_t = 1_000.0,
        allow_negative_numbers = true,
        help = "Number of simulated trials; fractional values are truncated"
    )]
    simulations: f64,
    #[arg(long, help = "Random seed; drawn from OS entropy when omitted")]
    seed: Option<u64>,
    #[arg(long, default_value_t = 30, help = "Histogram bin count")]
    bins: usize,
    #[arg(long, help = "Print the JSON response instead of the text report")]
    json: bool,
}

#[derive(Debug)]
struct ApiRequest {
    params: SimulationParameters,
    seed: Option<u64>,
    bins: usize,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PercentileBand {
    pub p10: f64,
    pub p90: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateResponse {
    pub params: SimulationParameters,
    pub seed: u64,
    pub final_wealths: Vec<f64>,
    pub sample_path: Vec<f64>,
    pub histogram: Histogram,
    pub summary: SummaryStatistics,
    pub percentiles: PercentileBand,
    pub probability_of_loss: f64,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

pub fn run_cli() -> Result<String, String> {
    let cli = Cli::parse();
    let json = cli.json;
    let request = build_request(cli)?;
    let response = execute(&request)?;
    if json {
        serde_json::to_string_pretty(&response).map_err(|e| format!("Serialization error: {e}"))
    } else {
        Ok(render_text_report(&response))
    }
}

fn build_request(cli: Cli) -> Result<ApiRequest, String> {
    if !cli.mean_return.is_finite() || cli.mean_return.abs() > MAX_RATE_PERCENT {
        return Err(format!(
            "--mean-return must be between -{MAX_RATE_PERCENT} and {MAX_RATE_PERCENT}"
        ));
    }

    if !cli.volatility.is_finite() || cli.volatility < 0.0 {
        return Err("--volatility must be >= 0".to_string());
    }
    if cli.volatility > MAX_RATE_PERCENT {
        return Err(format!("--volatility must be <= {MAX_RATE_PERCENT}"));
    }

    if !cli.starting_wealth.is_finite() || cli.starting_wealth <= 0.0 {
        return Err("--starting-wealth must be > 0".to_string());
    }

    if !cli.months.is_finite() || cli.months.trunc() < 0.0 {
        return Err("--months must be >= 0".to_string());
    }
    if cli.months.trunc() > MAX_MONTHS {
        return Err(format!("--months must be <= {MAX_MONTHS}"));
    }

    if !cli.simulations.is_finite() || cli.simulations.trunc() < 1.0 {
        return Err("--simulations must be > 0".to_string());
    }
    if cli.simulations.trunc() > MAX_SIMULATIONS {
        return Err(format!("--simulations must be <= {MAX_SIMULATIONS}"));
    }

    if cli.months.trunc() * cli.simulations.trunc() > MAX_TOTAL_DRAWS {
        return Err(format!(
            "--months x --simulations must be <= {MAX_TOTAL_DRAWS}"
        ));
    }

    if cli.bins == 0 || cli.bins > MAX_BINS {
        return Err(format!("--bins must be between 1 and {MAX_BINS}"));
    }

    if cli.seed.is_some_and(|seed| seed > MAX_SEED) {
        return Err(format!("--seed must be <= {MAX_SEED}"));
    }

    let params = SimulationParameters::new(
        cli.mean_return / 100.0,
        cli.volatility / 100.0,
        cli.starting_wealth,
        cli.months,
        cli.simulations,
    )
    .map_err(|e| e.to_string())?;

    Ok(ApiRequest {
        params,
        seed: cli.seed,
        bins: cli.bins,
    })
}

fn execute(request: &ApiRequest) -> Result<SimulateResponse, String> {
    let seed = request
        .seed
        .unwrap_or_else(|| rand::thread_rng().gen_range(0..=MAX_SEED));
    let result = run_simulation_seeded(&request.params, seed).map_err(|e| e.to_string())?;
    if result
        .final_wealths
        .iter()
        .chain(&result.sample_path)
        .any(|w| !w.is_finite())
    {
        return Err(
            "simulated wealth overflowed the finite range; lower volatility or months".to_string(),
        );
    }
    build_simulate_response(
        &request.params,
        seed,
        request.bins,
        result.final_wealths,
        result.sample_path,
    )
    .map_err(|e| e.to_string())
}

fn build_simulate_response(
    params: &SimulationParameters,
    seed: u64,
    bins: usize,
    final_wealths: Vec<f64>,
    sample_path: Vec<f64>,
) -> Result<SimulateResponse, SimulationError> {
    let summary = summarize(&final_wealths)?;
    let histogram = histogram(&final_wealths, bins)?;
    let percentiles = PercentileBand {
        p10: percentile(&final_wealths, 10.0)?,
        p90: percentile(&final_wealths, 90.0)?,
    };
    let losses = final_wealths
        .iter()
        .filter(|&&w| w < params.starting_wealth)
        .count();

    Ok(SimulateResponse {
        params: *params,
        seed,
        probability_of_loss: losses as f64 / final_wealths.len() as f64,
        final_wealths,
        sample_path,
        histogram,
        summary,
        percentiles,
    })
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = router();

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "growthsim HTTP API listening");
    info!("Local access: http://127.0.0.1:{port}/");

    axum::serve(listener, app).await
}

fn router() -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/styles.css", get(styles_handler))
        .route("/app.js", get(app_js_handler))
        .route(
            "/api/simulate",
            get(simulate_get_handler).post(simulate_post_handler),
        )
        .fallback(not_found_handler)
}

async fn index_handler() -> impl IntoResponse {
    with_cache_control(Html(INDEX_HTML))
}

async fn styles_handler() -> impl IntoResponse {
    with_cache_control((
        [(header::CONTENT_TYPE, "text/css; charset=utf-8")],
        STYLES_CSS,
    ))
}

async fn app_js_handler() -> impl IntoResponse {
    with_cache_control((
        [(
            header::CONTENT_TYPE,
            "application/javascript; charset=utf-8",
        )],
        APP_JS,
    ))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_get_handler(
    payload: Result<Query<SimulatePayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => simulate_handler_impl(payload).await,
        Err(rejection) => malformed_payload(rejection.body_text()),
    }
}

async fn simulate_post_handler(payload: Result<Json<SimulatePayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => simulate_handler_impl(payload).await,
        Err(rejection) => malformed_payload(rejection.body_text()),
    }
}

fn malformed_payload(msg: String) -> Response {
    warn!(error = %msg, "malformed simulation request");
    error_response(StatusCode::BAD_REQUEST, &msg)
}

async fn simulate_handler_impl(payload: SimulatePayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => {
            warn!(error = %msg, "rejected simulation request");
            return error_response(StatusCode::BAD_REQUEST, &msg);
        }
    };

    // Simulation is CPU-bound; keep it off the async workers.
    let outcome = tokio::task::spawn_blocking(move || execute(&request)).await;
    match outcome {
        Ok(Ok(response)) => json_response(StatusCode::OK, response),
        Ok(Err(msg)) => {
            warn!(error = %msg, "simulation failed");
            error_response(StatusCode::BAD_REQUEST, &msg)
        }
        Err(e) => {
            warn!(error = %e, "simulation task aborted");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Simulation task failed")
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<SimulatePayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: SimulatePayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.mean_return {
        cli.mean_return = v;
    }
    if let Some(v) = payload.volatility {
        cli.volatility = v;
    }
    if let Some(v) = payload.starting_wealth {
        cli.starting_wealth = v;
    }
    if let Some(v) = payload.months {
        cli.months = v;
    }
    if let Some(v) = payload.simulations {
        cli.simulations = v;
    }
    if let Some(v) = payload.seed {
        cli.seed = Some(v);
    }
    if let Some(v) = payload.bins {
        cli.bins = v;
    }

    build_request(cli).map_err(|msg| flag_to_field(&msg))
}

fn flag_to_field(msg: &str) -> String {
    [
        ("--mean-return", "meanReturn"),
        ("--volatility", "volatility"),
        ("--starting-wealth", "startingWealth"),
        ("--months", "months"),
        ("--simulations", "simulations"),
        ("--bins", "bins"),
        ("--seed", "seed"),
    ]
    .iter()
    .fold(msg.to_string(), |acc, (flag, field)| acc.replace(flag, field))
}

fn default_cli_for_api() -> Cli {
    Cli {
        mean_return: 3.78,
        volatility: 7.61,
        starting_wealth: 10_000.0,
        months: 12.0,
        simulations: 1_000.0,
        seed: None,
        bins: 30,
        json: false,
    }
}
