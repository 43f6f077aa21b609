//! Synthesized responses for when neither the network nor a bucket can answer.

use crate::fetch::Response;

use super::strategy::Fallback;

const OFFLINE_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Offline - Solar System Explorer</title>
<style>
  body { margin: 0; min-height: 100vh; display: flex; align-items: center; justify-content: center;
         background: radial-gradient(circle at top, #1b2735 0%, #090a0f 100%); color: #e8ecf1;
         font-family: system-ui, -apple-system, "Segoe UI", sans-serif; text-align: center; }
  main { max-width: 28rem; padding: 2rem; }
  h1 { font-size: 1.75rem; margin-bottom: 0.5rem; }
  p { color: #aab4c3; line-height: 1.5; }
  #retry { margin-top: 1.5rem; padding: 0.75rem 1.5rem; border: 0; border-radius: 999px;
           background: #f4b942; color: #090a0f; font-size: 1rem; cursor: pointer; }
  #retry:focus { outline: 3px solid #ffffff; outline-offset: 2px; }
</style>
</head>
<body>
<main role="main">
  <h1>You are offline</h1>
  <p>This page has not been saved for offline viewing yet. Check your connection and try again.</p>
  <button id="retry" type="button" onclick="window.location.reload()">Retry</button>
</main>
<script>
  window.addEventListener('online', function () { window.location.reload(); });
</script>
</body>
</html>
"#;

/// Marker present in the offline page's retry control.
pub const RETRY_CONTROL_ID: &str = "id=\"retry\"";

/// Build the terminal response for `fallback`.
pub fn synthesize(fallback: Fallback) -> Response {
    match fallback {
        Fallback::OfflinePage => offline_page(),
        Fallback::ServiceUnavailable => {
            Response::synthesized(503, "Service Unavailable", "text/plain; charset=utf-8", "Offline")
        }
        Fallback::OfflineApi => Response::synthesized(
            503,
            "Service Unavailable",
            "application/json",
            r#"{"error":"offline","message":"Network unavailable and no cached data for this request"}"#,
        ),
    }
}

/// The self-contained offline document.
pub fn offline_page() -> Response {
    let mut response = Response::synthesized(503, "Service Unavailable", "text/html; charset=utf-8", OFFLINE_PAGE);
    response.headers.push(("cache-control".into(), "no-store".into()));
    response
}
