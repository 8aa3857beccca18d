//! HTTP status surface
//!
//! `/` and `/health` answer uptime monitors with a page picked from the status
//! flags. `/stats` shows live numbers behind HTTP Basic auth.

use crate::WEB_TARGET;
use crate::config::StatsCredentials;
use crate::status::{LiveMetrics, StatusMode, StatusPage, StatusSnapshot, format_uptime};
use axum::{
    Router,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};

const STATS_REALM: &str = r#"Basic realm="stats""#;

/// Shared state of the status surface.
#[derive(Clone)]
pub struct WebState {
    pub status: Arc<StatusMode>,
    pub metrics: Arc<LiveMetrics>,
    pub credentials: Option<Arc<StatsCredentials>>,
}

pub fn router(state: WebState) -> Router {
    Router::new()
        .route("/", get(status_page))
        .route("/health", get(status_page))
        .route("/stats", get(stats_page))
        .with_state(state)
}

/// Bind `addr` and serve the status surface in the background
///
/// # Errors
/// Returns the bind error when the port is unavailable.
pub async fn spawn(addr: SocketAddr, state: WebState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(target: WEB_TARGET, %addr, "Status server listening");
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(state)).await {
            error!(target: WEB_TARGET, error = %e, "Status server stopped");
        }
    });
    Ok(())
}

async fn status_page(State(state): State<WebState>) -> Html<String> {
    Html(render_status(&state.status.snapshot()))
}

async fn stats_page(State(state): State<WebState>, headers: HeaderMap) -> Response {
    let Some(credentials) = state.credentials.as_deref() else {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Html(page("Stats unavailable", "⚙️", "The stats page is not configured.", "")),
        )
            .into_response();
    };

    if !is_authorized(&headers, credentials) {
        warn!(target: WEB_TARGET, "Rejected stats request");
        return (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, HeaderValue::from_static(STATS_REALM))],
            "Authentication required",
        )
            .into_response();
    }

    Html(render_stats(&state.status.snapshot(), &state.metrics)).into_response()
}

/// Check an `Authorization: Basic ...` header against the configured pair
fn is_authorized(headers: &HeaderMap, credentials: &StatsCredentials) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .and_then(|decoded| String::from_utf8(decoded).ok())
        .is_some_and(|pair| {
            pair.split_once(':').is_some_and(|(user, pass)| {
                user == credentials.username && pass == credentials.password
            })
        })
}

fn render_status(snapshot: &StatusSnapshot) -> String {
    let uptime = format!("Uptime: {}", format_uptime(snapshot.uptime));
    match snapshot.page() {
        StatusPage::EmergencyShutdown => page(
            "Emergency shutdown",
            "🛑",
            "The bot is in emergency shutdown mode. Commands are disabled.",
            &uptime,
        ),
        StatusPage::OwnerSleeping => page(
            "Owner is sleeping",
            "😴",
            "The bot is running, but its owner is asleep. Expect slow responses to issues.",
            &uptime,
        ),
        StatusPage::Updating => page(
            "Updating",
            "🔧",
            "The bot is being updated and may restart shortly.",
            &uptime,
        ),
        StatusPage::Online => page("Online", "✅", "The bot is online and running.", &uptime),
    }
}

fn render_stats(snapshot: &StatusSnapshot, metrics: &LiveMetrics) -> String {
    let latency = metrics
        .latency()
        .map_or_else(|| "unknown".to_string(), |l| format!("{} ms", l.as_millis()));
    let flag = |on: bool| if on { "on" } else { "off" };
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="30">
<title>{name} stats</title>
</head>
<body>
<h1>{name}</h1>
<table>
<tr><td>Servers</td><td>{guilds}</td></tr>
<tr><td>Latency</td><td>{latency}</td></tr>
<tr><td>Uptime</td><td>{uptime}</td></tr>
<tr><td>Emergency shutdown</td><td>{emergency}</td></tr>
<tr><td>Owner sleeping</td><td>{sleeping}</td></tr>
<tr><td>Updating</td><td>{updating}</td></tr>
</table>
</body>
</html>"#,
        name = escape(&metrics.bot_name()),
        guilds = metrics.guild_count(),
        uptime = format_uptime(snapshot.uptime),
        emergency = flag(snapshot.emergency_shutdown),
        sleeping = flag(snapshot.owner_sleeping),
        updating = flag(snapshot.updating),
    )
}

fn page(title: &str, icon: &str, message: &str, footer: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="font-family: sans-serif; text-align: center; margin-top: 10%;">
<h1>{icon} {title}</h1>
<p>{message}</p>
<p><small>{footer}</small></p>
</body>
</html>"#
    )
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use tower::ServiceExt;

    fn state(credentials: Option<StatsCredentials>) -> WebState {
        WebState {
            status: Arc::new(StatusMode::new()),
            metrics: Arc::new(LiveMetrics::new()),
            credentials: credentials.map(Arc::new),
        }
    }

    fn admin() -> StatsCredentials {
        StatsCredentials {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        }
    }

    async fn fetch(state: WebState, uri: &str, auth: Option<&str>) -> (StatusCode, HeaderMap, String) {
        let mut request = Request::builder().uri(uri);
        if let Some(auth) = auth {
            request = request.header(header::AUTHORIZATION, auth);
        }
        let response = router(state)
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, headers, String::from_utf8(body.to_vec()).unwrap())
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
    }

    #[tokio::test]
    async fn test_health_follows_precedence() {
        let state = state(None);
        let (code, _, body) = fetch(state.clone(), "/health", None).await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.contains("Online"));

        state.status.toggle_updating();
        state.status.toggle_owner_sleeping();
        let (code, _, body) = fetch(state.clone(), "/", None).await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.contains("Owner is sleeping"));

        state.status.toggle_emergency_shutdown();
        let (code, _, body) = fetch(state, "/health", None).await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.contains("Emergency shutdown"));
    }

    #[tokio::test]
    async fn test_stats_requires_credentials() {
        let (code, headers, _) = fetch(state(Some(admin())), "/stats", None).await;
        assert_eq!(code, StatusCode::UNAUTHORIZED);
        assert_eq!(headers.get(header::WWW_AUTHENTICATE).unwrap(), STATS_REALM);

        let wrong = basic("admin", "nope");
        let (code, _, _) = fetch(state(Some(admin())), "/stats", Some(&wrong)).await;
        assert_eq!(code, StatusCode::UNAUTHORIZED);

        let (code, _, _) = fetch(state(Some(admin())), "/stats", Some("Basic !!!")).await;
        assert_eq!(code, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_stats_page_content() {
        let state = state(Some(admin()));
        state.metrics.set_guild_count(12);
        state.metrics.set_bot_name("Warden");
        let right = basic("admin", "hunter2");

        let (code, _, body) = fetch(state, "/stats", Some(&right)).await;
        assert_eq!(code, StatusCode::OK);
        assert!(body.contains(r#"<meta http-equiv="refresh" content="30">"#));
        assert!(body.contains("<td>12</td>"));
        assert!(body.contains("Warden"));
        assert!(body.contains("unknown"));
    }

    #[tokio::test]
    async fn test_stats_unconfigured() {
        let (code, _, _) = fetch(state(None), "/stats", Some(&basic("a", "b"))).await;
        assert_eq!(code, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_password_may_contain_colon() {
        let credentials = StatsCredentials {
            username: "admin".to_string(),
            password: "a:b".to_string(),
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&basic("admin", "a:b")).unwrap(),
        );
        assert!(is_authorized(&headers, &credentials));
    }
}
