//! Responses for requests rejected by the gate.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Serialize;

pub const DENY_MESSAGE: &str = "Access denied: IP address not allowed";

#[derive(Debug, Serialize)]
pub struct IpDeniedBody<'a> {
    pub error: &'a str,
    pub client_ip: &'a str,
}

/// 403 for `client_ip`: JSON for API paths, an HTML page otherwise.
#[must_use]
pub fn deny_response(client_ip: &str, is_api: bool) -> Response {
    if is_api {
        (
            StatusCode::FORBIDDEN,
            Json(IpDeniedBody {
                error: DENY_MESSAGE,
                client_ip,
            }),
        )
            .into_response()
    } else {
        (StatusCode::FORBIDDEN, Html(deny_page(client_ip))).into_response()
    }
}

fn deny_page(client_ip: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Access denied</title>
</head>
<body>
<h1>Access denied</h1>
<p>Your IP address <code>{}</code> is not on the allow-list for this portal.</p>
<p>If you need access, contact your IT administrator and include the address above.</p>
</body>
</html>
"#,
        escape_html(client_ip)
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn page_escapes_the_reflected_address() {
        let page = deny_page("<script>alert(1)</script>");
        assert!(page.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(!page.contains("<script>"));
    }
}
