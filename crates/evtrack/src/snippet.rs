//! The browser side of identifier tracking.
//!
//! Server-side hits are only attributed to the right visitor if the server
//! knows the analytics identifiers the browser's tag generated. The snippet
//! asks `gtag` for them and posts each one to its configured route.

use serde_json::Value;

use crate::TrackingConfig;

/// Renders the `<script>` element for `config`.
///
/// Only routes with a configured path get a `gtag('get', …)` call; with
/// neither path configured the result is an empty string. The snippet
/// assumes `gtag` is loaded on the page and does nothing otherwise.
pub fn client_id_script(config: &TrackingConfig) -> String {
    let reports: Vec<String> = [
        ("client_id", &config.http_uri_cid),
        ("session_id", &config.http_uri_sid),
    ]
    .into_iter()
    .filter(|(_, path)| !path.is_empty())
    .map(|(field, path)| {
        format!(
            "  gtag('get', {tid}, '{field}', function (id) {{ report({path}, id); }});\n",
            tid = js_string(&config.tracking_id),
            path = js_string(path),
        )
    })
    .collect();

    if reports.is_empty() {
        return String::new();
    }

    let mut script = String::from(
        "<script>\n\
         (function () {\n\
         \x20 if (typeof gtag !== 'function') { return; }\n\
         \x20 function report(path, id) {\n\
         \x20   if (!id) { return; }\n\
         \x20   fetch(path, {\n\
         \x20     method: 'POST',\n\
         \x20     credentials: 'same-origin',\n\
         \x20     headers: { 'Content-Type': 'application/json', 'Accept': 'application/json' },\n\
         \x20     body: JSON.stringify({ id: String(id) })\n\
         \x20   });\n\
         \x20 }\n",
    );
    for report in reports {
        script.push_str(&report);
    }
    script.push_str("})();\n</script>\n");
    script
}

/// A JavaScript string literal that is also safe inside `<script>`.
fn js_string(value: &str) -> String {
    Value::String(value.to_owned())
        .to_string()
        .replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(cid: &str, sid: &str) -> TrackingConfig {
        TrackingConfig {
            tracking_id: "UA-1".into(),
            http_uri_cid: cid.into(),
            http_uri_sid: sid.into(),
            ..TrackingConfig::default()
        }
    }

    #[test]
    fn test_client_id_script_empty_without_paths() {
        assert_eq!(client_id_script(&config("", "")), "");
    }

    #[test]
    fn test_client_id_script_only_configured_routes() {
        let script = client_id_script(&config("/gaid", ""));

        assert!(script.starts_with("<script>"));
        assert!(script.trim_end().ends_with("</script>"));
        assert!(script.contains(r#"gtag('get', "UA-1", 'client_id', function (id) { report("/gaid", id); });"#));
        assert!(!script.contains("session_id"));
    }

    #[test]
    fn test_client_id_script_both_routes() {
        let script = client_id_script(&config("/cid", "/sid"));
        assert!(script.contains(r#"report("/cid", id)"#));
        assert!(script.contains(r#"'session_id', function (id) { report("/sid", id); }"#));
    }

    #[test]
    fn test_js_string_escapes_script_breakout() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
        assert_eq!(js_string("</script>"), r#""<\/script>""#);
    }
}
