use actix_web::HttpRequest;
use log::*;

use crate::config::ServerConfig;

/// Extracts the client IP, consulting proxy headers only when the deployment says they can be
/// trusted. Header order: Forwarded, then X-Forwarded-For, then the peer address.
pub fn get_remote_ip(req: &HttpRequest, config: &ServerConfig) -> Option<String> {
    if config.use_forwarded {
        if let Some(ip) = req
            .headers()
            .get("Forwarded")
            .and_then(|v| v.to_str().ok())
            .and_then(forwarded_for_ip)
        {
            trace!("🌐️ Using Forwarded header for remote IP: {ip}");
            return Some(ip);
        }
    }
    if config.use_x_forwarded_for {
        if let Some(ip) = req
            .headers()
            .get("X-Forwarded-For")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
        {
            trace!("🌐️ Using X-Forwarded-For header for remote IP: {ip}");
            return Some(ip);
        }
    }
    req.peer_addr().map(|a| a.ip().to_string())
}

/// Pulls the first `for=` element out of an RFC 7239 Forwarded header value.
fn forwarded_for_ip(value: &str) -> Option<String> {
    value
        .split(';')
        .flat_map(|part| part.split(','))
        .filter_map(|pair| {
            let (key, val) = pair.split_once('=')?;
            key.trim().eq_ignore_ascii_case("for").then(|| val.trim())
        })
        .map(|val| val.trim_matches('"').to_string())
        .find(|val| !val.is_empty())
}

/// Maximum nesting depth of braces and brackets in a JSON document, counted outside of string
/// literals so that payloads cannot smuggle structure inside quoted text.
pub fn json_nesting_depth(body: &[u8]) -> usize {
    let mut depth = 0usize;
    let mut max_depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for &b in body {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                max_depth = max_depth.max(depth);
            },
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {},
        }
    }
    max_depth
}
