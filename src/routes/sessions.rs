use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use axum_valid::Valid;

use crate::{
    dto::{
        results::ResultsResponse,
        session::{
            ActionResponse, CreateSessionRequest, JoinResponse, JoinSessionRequest,
            PlayerActionRequest, PlayerIdentityResponse, SessionListItem, SessionView, VoteRequest,
        },
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Session lifecycle and gameplay endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/{code}", get(get_session).delete(delete_session))
        .route("/sessions/{code}/players", post(join_session))
        .route("/sessions/{code}/players/{player_id}", get(find_player))
        .route("/sessions/{code}/start", post(start_game))
        .route("/sessions/{code}/votes", post(submit_vote))
        .route("/sessions/{code}/close-round", post(close_round))
        .route("/sessions/{code}/advance", post(advance))
        .route("/sessions/{code}/restart", post(restart))
        .route("/sessions/{code}/results", get(get_results))
}

/// Open a new lobby.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 201, description = "Session created", body = SessionView),
        (status = 400, description = "Invalid settings"),
        (status = 409, description = "Session code already in use")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<(StatusCode, Json<SessionView>), AppError> {
    let session = session_service::create_session(&state, payload).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// List stored sessions.
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "sessions",
    responses((status = 200, description = "Stored sessions", body = [SessionListItem]))
)]
pub async fn list_sessions(
    State(state): State<SharedState>,
) -> Result<Json<Vec<SessionListItem>>, AppError> {
    let sessions = session_service::list_sessions(&state).await?;
    Ok(Json(sessions))
}

/// Fetch the full state of a session.
#[utoipa::path(
    get,
    path = "/sessions/{code}",
    tag = "sessions",
    params(("code" = String, Path, description = "Session code")),
    responses(
        (status = 200, description = "Session state", body = SessionView),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<SessionView>, AppError> {
    let session = session_service::get_session(&state, &code).await?;
    Ok(Json(session))
}

/// Delete a session and disconnect its players.
#[utoipa::path(
    delete,
    path = "/sessions/{code}",
    tag = "sessions",
    params(("code" = String, Path, description = "Session code")),
    responses(
        (status = 204, description = "Session deleted"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn delete_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<StatusCode, AppError> {
    session_service::delete_session(&state, &code).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Join a lobby. The first player becomes the host.
#[utoipa::path(
    post,
    path = "/sessions/{code}/players",
    tag = "players",
    params(("code" = String, Path, description = "Session code")),
    request_body = JoinSessionRequest,
    responses(
        (status = 200, description = "Player joined", body = JoinResponse),
        (status = 400, description = "Invalid name"),
        (status = 404, description = "Unknown session"),
        (status = 409, description = "Game already started or name taken")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<JoinSessionRequest>>,
) -> Result<Json<JoinResponse>, AppError> {
    let joined = session_service::join(&state, &code, payload).await?;
    Ok(Json(joined))
}

/// Look up a returning player by id.
#[utoipa::path(
    get,
    path = "/sessions/{code}/players/{player_id}",
    tag = "players",
    params(
        ("code" = String, Path, description = "Session code"),
        ("player_id" = String, Path, description = "Player id stored by the client")
    ),
    responses(
        (status = 200, description = "Known player", body = PlayerIdentityResponse),
        (status = 404, description = "Unknown session or player")
    )
)]
pub async fn find_player(
    State(state): State<SharedState>,
    Path((code, player_id)): Path<(String, String)>,
) -> Result<Json<PlayerIdentityResponse>, AppError> {
    let player = session_service::find_player(&state, &code, &player_id).await?;
    Ok(Json(player))
}

/// Start the game. Host only.
#[utoipa::path(
    post,
    path = "/sessions/{code}/start",
    tag = "game",
    params(("code" = String, Path, description = "Session code")),
    request_body = PlayerActionRequest,
    responses(
        (status = 200, description = "Game started", body = ActionResponse),
        (status = 400, description = "Not enough players"),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "Game not in the lobby")
    )
)]
pub async fn start_game(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = session_service::start(&state, &code, &payload.player_id).await?;
    Ok(Json(response))
}

/// Vote for a player on the current question.
#[utoipa::path(
    post,
    path = "/sessions/{code}/votes",
    tag = "game",
    params(("code" = String, Path, description = "Session code")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded", body = ActionResponse),
        (status = 404, description = "Unknown session or player"),
        (status = 409, description = "No open round")
    )
)]
pub async fn submit_vote(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<VoteRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = session_service::submit_vote(&state, &code, payload).await?;
    Ok(Json(response))
}

/// Close the current round before everyone voted. Host only.
#[utoipa::path(
    post,
    path = "/sessions/{code}/close-round",
    tag = "game",
    params(("code" = String, Path, description = "Session code")),
    request_body = PlayerActionRequest,
    responses(
        (status = 200, description = "Round closed", body = ActionResponse),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "No open round")
    )
)]
pub async fn close_round(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = session_service::close_round(&state, &code, &payload.player_id).await?;
    Ok(Json(response))
}

/// Move on from the round results. Host only.
#[utoipa::path(
    post,
    path = "/sessions/{code}/advance",
    tag = "game",
    params(("code" = String, Path, description = "Session code")),
    request_body = PlayerActionRequest,
    responses(
        (status = 200, description = "Next question or final results", body = ActionResponse),
        (status = 403, description = "Caller is not the host"),
        (status = 409, description = "Round results not showing")
    )
)]
pub async fn advance(
    State(state): State<SharedState>,
    Path(code): Path<String>,
    Valid(Json(payload)): Valid<Json<PlayerActionRequest>>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = session_service::advance(&state, &code, &payload.player_id).await?;
    Ok(Json(response))
}

/// Return to the lobby with the same players.
#[utoipa::path(
    post,
    path = "/sessions/{code}/restart",
    tag = "game",
    params(("code" = String, Path, description = "Session code")),
    responses(
        (status = 200, description = "Back in the lobby", body = ActionResponse),
        (status = 409, description = "Game not finished")
    )
)]
pub async fn restart(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<ActionResponse>, AppError> {
    let response = session_service::restart(&state, &code).await?;
    Ok(Json(response))
}

/// Final scores, round winners and awards.
#[utoipa::path(
    get,
    path = "/sessions/{code}/results",
    tag = "game",
    params(("code" = String, Path, description = "Session code")),
    responses(
        (status = 200, description = "Final results", body = ResultsResponse),
        (status = 409, description = "Game not finished")
    )
)]
pub async fn get_results(
    State(state): State<SharedState>,
    Path(code): Path<String>,
) -> Result<Json<ResultsResponse>, AppError> {
    let results = session_service::results(&state, &code).await?;
    Ok(Json(results))
}
