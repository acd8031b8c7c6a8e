//! Single binary web server: REST API over the tournament engine with in-memory stores.
//! Run with: cargo run --bin web
//! Listens on 0.0.0.0:8080 by default.
//! Override with env: HOST (e.g. 0.0.0.0), PORT (e.g. 8080).

use actix_web::{
    get, post, put,
    web::{Data, Json, Path},
    App, HttpResponse, HttpServer, Responder,
};
use rotation_tournament::{
    MemoryPlayerStore, MemoryTournamentStore, NotificationKind, PlayerId, SetId, Tournament, TournamentConfig,
    TournamentEngine, TournamentError, TournamentEvent, TournamentId, TournamentState,
};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;

type Engine = TournamentEngine<MemoryTournamentStore, MemoryPlayerStore>;

/// Shared engine; the stores do their own locking.
type AppState = Data<Engine>;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    service: &'static str,
}

/// Tournament document plus its derived phase.
#[derive(Serialize)]
struct TournamentView<'a> {
    #[serde(flatten)]
    tournament: &'a Tournament,
    state: TournamentState,
}

fn view(tournament: &Tournament) -> TournamentView<'_> {
    TournamentView {
        tournament,
        state: tournament.state(),
    }
}

#[derive(Deserialize)]
struct CreatePlayerBody {
    id: PlayerId,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct RegisterBody {
    player_id: PlayerId,
    #[serde(default)]
    invite_code: Option<String>,
}

#[derive(Deserialize)]
struct ScoreBody {
    team_1_games: u32,
    team_2_games: u32,
}

/// Path segment: tournament id (e.g. /api/tournaments/{id})
#[derive(Deserialize)]
struct TournamentPath {
    id: TournamentId,
}

/// Path segments: tournament id and set id (e.g. /api/tournaments/{id}/sets/{set_id}/score)
#[derive(Deserialize)]
struct TournamentSetPath {
    id: TournamentId,
    set_id: SetId,
}

#[derive(Deserialize)]
struct PlayerPath {
    player_id: PlayerId,
}

fn error_response(e: &TournamentError) -> HttpResponse {
    let body = serde_json::json!({ "error": e.to_string(), "retryable": e.is_retryable() });
    match e {
        TournamentError::TournamentNotFound(_) | TournamentError::PlayerNotFound(_) | TournamentError::UnknownSet(_) => {
            HttpResponse::NotFound().json(body)
        }
        TournamentError::ConcurrentModification => HttpResponse::Conflict().json(body),
        TournamentError::Store(_) => HttpResponse::ServiceUnavailable().json(body),
        TournamentError::MalformedRecord(_) => HttpResponse::InternalServerError().json(body),
        _ => HttpResponse::BadRequest().json(body),
    }
}

#[get("/api/health")]
async fn api_health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        ok: true,
        service: "rotation-tournament",
    })
}

/// Create a player record at the initial rating (returns the existing one if already known).
#[post("/api/players")]
async fn api_create_player(state: AppState, body: Json<CreatePlayerBody>) -> HttpResponse {
    match state.ensure_player(body.id.trim(), body.name.trim()).await {
        Ok(player) => HttpResponse::Ok().json(player),
        Err(e) => error_response(&e),
    }
}

#[get("/api/players/{player_id}")]
async fn api_get_player(state: AppState, path: Path<PlayerPath>) -> HttpResponse {
    match state.player(&path.player_id).await {
        Ok(player) => HttpResponse::Ok().json(player),
        Err(e) => error_response(&e),
    }
}

/// Upcoming, current and past tournaments for a player.
#[get("/api/players/{player_id}/tournaments")]
async fn api_player_overview(state: AppState, path: Path<PlayerPath>) -> HttpResponse {
    match state.overview(&path.player_id, chrono::Utc::now()).await {
        Ok(overview) => HttpResponse::Ok().json(overview),
        Err(e) => error_response(&e),
    }
}

/// Create a tournament; the creator is registered automatically.
#[post("/api/tournaments")]
async fn api_create_tournament(state: AppState, body: Json<TournamentConfig>) -> HttpResponse {
    match state.create_tournament(body.into_inner()).await {
        Ok(t) => HttpResponse::Ok().json(view(&t)),
        Err(e) => error_response(&e),
    }
}

#[get("/api/tournaments/{id}")]
async fn api_get_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    match state.tournament(path.id).await {
        Ok(t) => HttpResponse::Ok().json(view(&t)),
        Err(e) => error_response(&e),
    }
}

/// Register a player (Registering only). Filling the last place pairs round 1.
#[post("/api/tournaments/{id}/players")]
async fn api_register_player(state: AppState, path: Path<TournamentPath>, body: Json<RegisterBody>) -> HttpResponse {
    match state
        .register_player(path.id, &body.player_id, body.invite_code.as_deref())
        .await
    {
        Ok(t) => HttpResponse::Ok().json(view(&t)),
        Err(e) => error_response(&e),
    }
}

/// Close registration and pair round 1.
#[post("/api/tournaments/{id}/start")]
async fn api_start_tournament(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    match state.close_registration(path.id).await {
        Ok(t) => HttpResponse::Ok().json(view(&t)),
        Err(e) => error_response(&e),
    }
}

/// Submit the final score of one set in the current round.
#[put("/api/tournaments/{id}/sets/{set_id}/score")]
async fn api_submit_score(state: AppState, path: Path<TournamentSetPath>, body: Json<ScoreBody>) -> HttpResponse {
    match state
        .submit_score(path.id, path.set_id, body.team_1_games, body.team_2_games)
        .await
    {
        Ok(outcome) => HttpResponse::Ok().json(outcome),
        Err(e) => error_response(&e),
    }
}

/// Retry a round transition that failed after the last score of a round.
#[post("/api/tournaments/{id}/advance")]
async fn api_advance(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    match state.advance(path.id).await {
        Ok(progress) => HttpResponse::Ok().json(progress),
        Err(e) => error_response(&e),
    }
}

/// Live standings; final once the tournament is completed.
#[get("/api/tournaments/{id}/standings")]
async fn api_standings(state: AppState, path: Path<TournamentPath>) -> HttpResponse {
    match state.standings(path.id).await {
        Ok(results) => HttpResponse::Ok().json(results),
        Err(e) => error_response(&e),
    }
}

/// Stand-in for push delivery: log what each player would be told.
fn log_notification(event: &TournamentEvent) {
    let Some(kind) = event.notification() else {
        return;
    };
    match event {
        TournamentEvent::RoundGenerated {
            tournament_id,
            round_number,
            sets,
            byes,
        } => {
            log::info!("[{}] tournament {} round {}", kind.as_str(), tournament_id, round_number);
            for set in sets {
                log::info!(
                    "Court {}: {} vs {}",
                    set.court_number,
                    set.teams[0].player_ids.join(", "),
                    set.teams[1].player_ids.join(", ")
                );
            }
            if !byes.is_empty() {
                log::info!("Sitting out: {}", byes.join(", "));
            }
        }
        TournamentEvent::TournamentCompleted { tournament_id, results } => {
            log::info!(
                "[{}] tournament {} top performers: {}",
                kind.as_str(),
                tournament_id,
                results.top_performers.join(", ")
            );
        }
        other => {
            if kind == NotificationKind::ScoreSubmission {
                log::debug!("[{}] tournament {}", kind.as_str(), other.tournament_id());
            }
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let host = std::env::var("HOST").unwrap_or_else(|_| default_host());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or_else(default_port);
    let bind = (host.as_str(), port);
    log::info!("Starting server at http://{}:{}", bind.0, bind.1);

    let state = Data::new(TournamentEngine::new(
        MemoryTournamentStore::new(),
        MemoryPlayerStore::new(),
    ));

    // Background task: relay tournament events as player notifications
    let mut events = state.subscribe();
    actix_web::rt::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_notification(&event),
                Err(RecvError::Lagged(missed)) => log::warn!("Notification relay skipped {} event(s)", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(api_health)
            .service(api_create_player)
            .service(api_get_player)
            .service(api_player_overview)
            .service(api_create_tournament)
            .service(api_get_tournament)
            .service(api_register_player)
            .service(api_start_tournament)
            .service(api_submit_score)
            .service(api_advance)
            .service(api_standings)
    })
    .bind(bind)?
    .run()
    .await
}
