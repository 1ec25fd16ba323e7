use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{
        IntoResponse, Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use futures_util::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::time::Duration;
use tokio_stream::wrappers::WatchStream;

use crate::AppState;
use crate::state::session::{SessionLease, session_cookie, session_id_from_headers};
use crate::state::shell::Theme;

/// Streams the session's theme to the browser: the current value first, then every toggle.
/// Open tabs of the same session use it to follow a theme change made in another tab.
/// The session is not reaped while the stream stays open.
pub async fn handle_theme_stream(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let id = session_id_from_headers(&headers);
    let (session, created) = state.sessions.get_or_create(id.as_deref()).await;

    let stream = theme_events(WatchStream::new(session.shell.subscribe()), session.hold());
    let mut resp = Sse::new(stream)
        .keep_alive(KeepAlive::default().interval(Duration::from_secs(15)))
        .into_response();

    if created {
        if let Ok(v) = HeaderValue::from_str(&session_cookie(&session.id)) {
            resp.headers_mut().append(header::SET_COOKIE, v);
        }
    }
    resp
}

fn theme_events(
    themes: impl Stream<Item = Theme> + Send + 'static,
    lease: SessionLease,
) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static {
    themes.map(move |theme| {
        let _held = &lease;
        Ok(Event::default().event("theme").data(theme.as_str()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::session::SessionStore;
    use crate::state::shell::ShellState;

    #[tokio::test]
    async fn emits_current_theme_then_toggles() {
        let shell = ShellState::init(Theme::Light);
        let mut themes = WatchStream::new(shell.subscribe());

        assert_eq!(themes.next().await, Some(Theme::Light));
        shell.toggle_theme();
        assert_eq!(themes.next().await, Some(Theme::Dark));
    }

    #[tokio::test]
    async fn open_stream_keeps_session_alive() {
        let store = SessionStore::new(Theme::Light, Duration::ZERO);
        let (session, _) = store.get_or_create(None).await;
        let stream = theme_events(WatchStream::new(session.shell.subscribe()), session.hold());
        assert_eq!(store.evict_idle().await, 0);

        drop(stream);
        assert_eq!(store.evict_idle().await, 1);
    }
}
