// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Server-Sent Events feed of live rides.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};

const EVENT_NAME: &str = "active-rides";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/live/rides", get(live_rides))
}

struct LiveFeed {
    state: Arc<AppState>,
    ticker: Interval,
    /// Last payload sent, to suppress unchanged snapshots
    last_payload: Option<String>,
}

/// Poll until the live ride list differs from the last one sent.
async fn next_event(mut feed: LiveFeed) -> Option<(Result<Event, Infallible>, LiveFeed)> {
    loop {
        feed.ticker.tick().await;

        let rides = match feed.state.db.list_live_rides().await {
            Ok(rides) => rides,
            Err(e) => {
                tracing::warn!(error = %e, "Live ride poll failed");
                continue;
            }
        };
        let payload = match serde_json::to_string(&rides) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize live rides");
                continue;
            }
        };

        if feed.last_payload.as_deref() == Some(payload.as_str()) {
            continue;
        }

        tracing::debug!(rides = rides.len(), "Live rides changed");
        let event = Event::default().event(EVENT_NAME).data(&payload);
        feed.last_payload = Some(payload);
        return Some((Ok(event), feed));
    }
}

async fn live_rides(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut ticker = interval(Duration::from_secs(state.config.live_poll_seconds.max(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let feed = LiveFeed {
        state,
        ticker,
        last_payload: None,
    };

    Sse::new(stream::unfold(feed, next_event)).keep_alive(KeepAlive::default())
}
