//! WebSocket connectivity checks
//!
//! Real-time notifications are optional for the platform, so most of these
//! units report problems without failing.

use futures::FutureExt;
use tracing::{info, warn};

use crate::browser::{PageAction, PageSnapshot};
use crate::error::E2eResult;
use crate::suite::TestUnit;
use crate::suites::ui::login_actions;
use crate::suites::{browser_setup_unit, Session};

const ENDPOINTS: &[&str] = &["/ws", "/ws/info", "/ws/websocket"];

/// Markers of websocket traffic in URLs and console output. A bare "ws" would
/// match words like "news".
const WS_MARKERS: &[&str] = &["websocket", "/ws", "ws://", "wss://", "sockjs", "stomp"];

pub fn units() -> Vec<TestUnit<Session>> {
    vec![
        browser_setup_unit(),
        TestUnit::new("WebSocket Endpoint Availability", |s: &mut Session| {
            endpoint_availability(s).boxed()
        })
        .with_hint("Check notification service configuration if needed"),
        TestUnit::new("WebSocket Network Errors", |s: &mut Session| network_errors(s).boxed()),
        TestUnit::new("WebSocket Console Errors", |s: &mut Session| console_errors(s).boxed()),
    ]
}

/// Anything but a missing or broken endpoint counts as reachable
pub fn endpoint_accessible(status: u16) -> bool {
    !matches!(status, 404 | 500)
}

pub fn describe_status(status: u16) -> &'static str {
    match status {
        101 => "switching protocols",
        200 => "available",
        403 => "forbidden (may need authentication)",
        404 => "not found",
        426 => "upgrade required (normal for WebSocket)",
        500 => "server error",
        _ => "unexpected status",
    }
}

fn mentions_websocket(text: &str) -> bool {
    let text = text.to_lowercase();
    WS_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Failed requests and console lines in `snapshot` that concern websockets
pub fn websocket_issues(snapshot: &PageSnapshot) -> Vec<String> {
    let requests = snapshot
        .failed_requests
        .iter()
        .filter(|r| mentions_websocket(&r.url))
        .map(|r| format!("request {} failed: {}", r.url, r.failure));
    let console = snapshot
        .console
        .iter()
        .filter(|c| mentions_websocket(&c.text))
        .map(|c| format!("console {}: {}", c.level, c.text));
    requests.chain(console).collect()
}

/// Console errors mentioning websockets
pub fn websocket_console_errors(snapshot: &PageSnapshot) -> Vec<String> {
    snapshot
        .console
        .iter()
        .filter(|c| c.level == "error" && mentions_websocket(&c.text))
        .map(|c| c.text.clone())
        .collect()
}

async fn endpoint_availability(session: &mut Session) -> E2eResult<bool> {
    info!("🔌 Testing WebSocket Endpoint Availability...");
    let mut client = session.fresh_client()?;
    if let Err(e) = client.login(&session.config.credentials).await {
        warn!("   ⚠️ Could not authenticate for WebSocket check: {}", e);
    }

    let mut accessible = 0;
    for endpoint in ENDPOINTS {
        match client.status_of(endpoint).await {
            Ok(status) if endpoint_accessible(status) => {
                info!("   ✅ {}: HTTP {} ({})", endpoint, status, describe_status(status));
                accessible += 1;
            }
            Ok(status) => {
                warn!("   ❌ {}: HTTP {} ({})", endpoint, status, describe_status(status));
            }
            Err(e) => warn!("   ❌ {}: {}", endpoint, e),
        }
    }

    if accessible > 0 {
        info!("✅ WebSocket endpoints reachable ({}/{})", accessible, ENDPOINTS.len());
        Ok(true)
    } else {
        warn!("⚠️ No WebSocket endpoint is reachable");
        Ok(false)
    }
}

async fn network_errors(session: &mut Session) -> E2eResult<bool> {
    info!("🌐 Testing WebSocket Network Errors...");
    let mut actions = vec![PageAction::navigate("/")];
    actions.extend(login_actions(&session.config.credentials));
    actions.push(PageAction::sleep(5_000));

    let snapshot = session.browser()?.run(&actions).await?;
    let issues = websocket_issues(&snapshot);

    if issues.is_empty() {
        info!("✅ No WebSocket network errors detected");
    } else {
        warn!("⚠️ Found {} WebSocket-related issues:", issues.len());
        for issue in &issues {
            warn!("   • {}", issue);
        }
    }
    Ok(true)
}

async fn console_errors(session: &mut Session) -> E2eResult<bool> {
    info!("📟 Testing WebSocket Console Errors...");
    let snapshot = session.browser()?.run(&[PageAction::sleep(1_000)]).await?;
    let errors = websocket_console_errors(&snapshot);

    if errors.is_empty() {
        info!("✅ No WebSocket console errors");
    } else {
        warn!("⚠️ {} WebSocket console errors:", errors.len());
        for error in &errors {
            warn!("   • {}", error);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::{ConsoleEntry, FailedRequest};
    use test_case::test_case;

    #[test_case(101, true ; "switching protocols")]
    #[test_case(200, true ; "ok")]
    #[test_case(403, true ; "forbidden")]
    #[test_case(426, true ; "upgrade required")]
    #[test_case(404, false ; "not found")]
    #[test_case(500, false ; "server error")]
    fn test_endpoint_accessible(status: u16, expected: bool) {
        assert_eq!(endpoint_accessible(status), expected);
    }

    fn snapshot() -> PageSnapshot {
        PageSnapshot {
            console: vec![
                ConsoleEntry {
                    level: "error".to_string(),
                    text: "WebSocket connection to 'ws://app/ws' failed".to_string(),
                },
                ConsoleEntry {
                    level: "warning".to_string(),
                    text: "STOMP: reconnecting".to_string(),
                },
                ConsoleEntry {
                    level: "error".to_string(),
                    text: "Failed to load image".to_string(),
                },
            ],
            failed_requests: vec![
                FailedRequest {
                    url: "http://app/ws/info".to_string(),
                    failure: "net::ERR_FAILED".to_string(),
                },
                FailedRequest {
                    url: "http://app/logo.png".to_string(),
                    failure: "net::ERR_ABORTED".to_string(),
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_websocket_issues_filters_unrelated() {
        let issues = websocket_issues(&snapshot());
        assert_eq!(issues.len(), 3);
        assert!(issues[0].contains("/ws/info"));
        assert!(issues.iter().all(|i| !i.contains("logo.png")));
    }

    #[test]
    fn test_console_errors_only_error_level() {
        let errors = websocket_console_errors(&snapshot());
        assert_eq!(errors, vec!["WebSocket connection to 'ws://app/ws' failed".to_string()]);
    }

    #[test_case("http://app/ws/info", true ; "endpoint path")]
    #[test_case("wss://app/notifications", true ; "secure scheme")]
    #[test_case("SockJS transport closed", true ; "sockjs")]
    #[test_case("http://app/news", false ; "news path")]
    #[test_case("Loaded 3 views", false ; "views")]
    #[test_case("Windows user agent detected", false ; "windows")]
    fn test_mentions_websocket(text: &str, expected: bool) {
        assert_eq!(mentions_websocket(text), expected);
    }

    #[test]
    fn test_unrelated_words_are_not_websocket_issues() {
        let snapshot = PageSnapshot {
            console: vec![ConsoleEntry {
                level: "error".to_string(),
                text: "Failed to render news widget in views panel".to_string(),
            }],
            failed_requests: vec![FailedRequest {
                url: "http://app/news/windows".to_string(),
                failure: "net::ERR_FAILED".to_string(),
            }],
            ..Default::default()
        };
        assert!(websocket_issues(&snapshot).is_empty());
        assert!(websocket_console_errors(&snapshot).is_empty());
    }

    #[test]
    fn test_clean_page_has_no_issues() {
        assert!(websocket_issues(&PageSnapshot::default()).is_empty());
    }
}
