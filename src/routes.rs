use std::{net::SocketAddr, sync::Arc};

use axum::{
    Json,
    extract::{ConnectInfo, Path, State as AppState},
    http::{
        HeaderMap,
        header::{CACHE_CONTROL, CONTENT_TYPE},
    },
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    error::{AppError, QuotaScope},
    ledger::{GLOBAL_LIMIT, USER_LIMIT, Reservation, utc_today},
    models::Tracklist,
    state::State,
    upstream::{build_cover_url, fetch_cover, generate_tracklist},
    utils::client_id,
    vault::{COVER_TTL, Redemption},
};

pub const MAX_VIBE_LEN: usize = 600;

#[derive(Deserialize)]
pub struct GenerateRequest {
    vibe: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    tracklist: Tracklist,
    cover_token: String,
    remaining: RemainingBody,
}

#[derive(Serialize)]
pub struct RemainingBody {
    user: u32,
    global: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    global_remaining: u32,
    user_remaining: u32,
    global_limit: u32,
    user_limit: u32,
    reset_policy: &'static str,
}

pub async fn status_handler(
    AppState(state): AppState<Arc<State>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Json<StatusResponse> {
    let client = client_id(&headers, Some(peer));

    let remaining = state
        .ledger
        .lock()
        .expect("ledger mutex poisoned")
        .remaining(&client, utc_today());

    Json(StatusResponse {
        global_remaining: remaining.global,
        user_remaining: remaining.user,
        global_limit: GLOBAL_LIMIT,
        user_limit: USER_LIMIT,
        reset_policy: "daily-utc",
    })
}

/// The one ordering that matters: validate input, reserve, call upstream,
/// validate output, then commit quota and issue the cover token. Everything
/// before the commit is free to fail without costing the caller anything.
pub async fn generate_handler(
    AppState(state): AppState<Arc<State>>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(payload): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let client = client_id(&headers, Some(peer));

    let vibe = validate_vibe(&payload.vibe)?;

    let reservation = state
        .ledger
        .lock()
        .expect("ledger mutex poisoned")
        .try_reserve(&client, utc_today());

    match reservation {
        Reservation::DeniedGlobal => {
            info!("Denied {client}: site-wide limit reached");
            return Err(AppError::QuotaExceeded(QuotaScope::Global));
        }
        Reservation::DeniedUser => {
            info!("Denied {client}: personal limit reached");
            return Err(AppError::QuotaExceeded(QuotaScope::User));
        }
        Reservation::Allowed => {}
    }

    let Some(api_key) = state.config.api_key.as_deref() else {
        return Err(AppError::MisconfiguredServer);
    };

    let tracklist = generate_tracklist(&state.http, &state.config, api_key, &vibe).await?;

    let response = complete_generation(&state, &client, &vibe, tracklist)?;

    Ok(Json(response))
}

pub async fn cover_handler(
    AppState(state): AppState<Arc<State>>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    let redemption = state
        .vault
        .lock()
        .expect("vault mutex poisoned")
        .redeem(&token);

    let resource = match redemption {
        Redemption::NotFound => return Err(AppError::TokenNotFound),
        Redemption::Expired => return Err(AppError::TokenExpired),
        Redemption::Fulfilled(resource) => resource,
    };

    let (content_type, bytes) = fetch_cover(&state.http, &resource).await?;

    Ok((
        [
            (CONTENT_TYPE, content_type),
            (CACHE_CONTROL, "public, max-age=86400".to_string()),
        ],
        bytes,
    )
        .into_response())
}

fn validate_vibe(raw: &str) -> Result<String, AppError> {
    let vibe = raw.trim();

    if vibe.is_empty() {
        return Err(AppError::ValidationFailed("vibe must not be empty".into()));
    }

    if vibe.chars().count() > MAX_VIBE_LEN {
        return Err(AppError::ValidationFailed(format!(
            "vibe must be at most {MAX_VIBE_LEN} characters"
        )));
    }

    Ok(vibe.to_string())
}

/// Runs once the upstream call has succeeded: charge the quota, mint the
/// cover token, report what is left. Single synchronous step, no awaits.
fn complete_generation(
    state: &State,
    client: &str,
    vibe: &str,
    tracklist: Tracklist,
) -> Result<GenerateResponse, AppError> {
    let cover_url = build_cover_url(&state.config.image_url, vibe)?;

    let remaining = {
        let mut ledger = state.ledger.lock().expect("ledger mutex poisoned");
        let today = utc_today();

        ledger.commit(client, today);
        ledger.remaining(client, today)
    };

    let cover_token = state
        .vault
        .lock()
        .expect("vault mutex poisoned")
        .issue(cover_url, COVER_TTL);

    info!(
        "Generated {} tracks for {client}, {} personal / {} global left",
        tracklist.tracks.len(),
        remaining.user,
        remaining.global
    );

    Ok(GenerateResponse {
        tracklist,
        cover_token,
        remaining: RemainingBody {
            user: remaining.user,
            global: remaining.global,
        },
    })
}

#[cfg(test)]
mod tests {
    use crate::{config::Config, models::Track, vault::Redemption};

    use super::*;

    fn test_state() -> Arc<State> {
        State::with_config(Config {
            port: 0,
            api_key: Some("test-key".to_string()),
            model: "test-model".to_string(),
            chat_url: "https://chat.example/v1".to_string(),
            image_url: "https://image.example/prompt".to_string(),
        })
    }

    fn tracklist() -> Tracklist {
        Tracklist {
            title: Some("test tape".to_string()),
            tracks: vec![Track {
                title: "Myth".to_string(),
                artist: "Beach House".to_string(),
            }],
        }
    }

    #[test]
    fn overlong_vibe_is_rejected() {
        let err = validate_vibe(&"x".repeat(MAX_VIBE_LEN + 1)).unwrap_err();

        assert!(matches!(err, AppError::ValidationFailed { .. }));
    }

    #[test]
    fn boundary_length_vibe_is_accepted() {
        assert!(validate_vibe(&"x".repeat(MAX_VIBE_LEN)).is_ok());
    }

    #[test]
    fn whitespace_only_vibe_is_rejected() {
        let err = validate_vibe("   \n  ").unwrap_err();

        assert!(matches!(err, AppError::ValidationFailed { .. }));
    }

    #[test]
    fn vibe_is_trimmed() {
        assert_eq!(validate_vibe("  rainy dusk  ").unwrap(), "rainy dusk");
    }

    #[test]
    fn completion_charges_quota_and_mints_a_redeemable_token() {
        let state = test_state();

        let response = complete_generation(&state, "1.2.3.4", "rainy dusk", tracklist()).unwrap();

        assert_eq!(response.remaining.user, USER_LIMIT - 1);
        assert_eq!(response.remaining.global, GLOBAL_LIMIT - 1);

        let redemption = state
            .vault
            .lock()
            .unwrap()
            .redeem(&response.cover_token);

        match redemption {
            Redemption::Fulfilled(resource) => {
                assert!(resource.starts_with("https://image.example/prompt/"));
            }
            other => panic!("expected a live cover URL, got {other:?}"),
        }
    }

    #[test]
    fn validation_happens_before_any_quota_charge() {
        let state = test_state();

        assert!(validate_vibe("").is_err());

        let remaining = state
            .ledger
            .lock()
            .unwrap()
            .remaining("1.2.3.4", utc_today());

        assert_eq!(remaining.user, USER_LIMIT);
        assert_eq!(remaining.global, GLOBAL_LIMIT);
    }
}
