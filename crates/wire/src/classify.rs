// SPDX-License-Identifier: MIT

//! `(method, path)` → [`MessageType`] classification for the protocol log:
//! a static table for fixed routes, then a handful of prefix/suffix checks
//! for the `/nodes/<id>/...` family.

use sw_core::MessageType;

/// Classifies a request for protocol-log purposes. `path` should be the raw
/// request-target (query string and trailing slash are stripped here).
pub fn classify_message(method: &str, path: &str) -> MessageType {
    let clean = normalize_path(path);

    match (method, clean.as_str()) {
        ("GET", "/api/v1/health") => return MessageType::HealthCheck,
        ("GET", "/api/v1/nodes") => return MessageType::NodeList,
        ("GET", "/api/v1/orchestrator") => return MessageType::Discovery,
        ("GET", "/api/v1/work") => return MessageType::WorkRequest,
        ("GET", "/api/v1/status") => return MessageType::StatusQuery,
        ("GET", "/api/v1/history") => return MessageType::HistoryQuery,
        ("GET", "/api/v1/events") => return MessageType::EventsQuery,
        ("GET", "/api/v1/protocol") => return MessageType::ProtocolQuery,
        ("GET", "/api/v1/protocol/detail") => return MessageType::ProtocolQuery,
        ("GET", "/api/v1/protocol/stats") => return MessageType::ProtocolQuery,
        ("GET", "/api/v1/protocol/density") => return MessageType::ProtocolQuery,
        ("GET", "/api/v1/protocol/snapshot") => return MessageType::ProtocolQuery,
        ("POST", "/api/v1/register") => return MessageType::Register,
        ("POST", "/api/v1/complete") => return MessageType::Complete,
        ("POST", "/api/v1/queue") => return MessageType::Queue,
        ("POST", "/api/v1/control") => return MessageType::Control,
        _ => {}
    }

    if let Some(rest) = clean.strip_prefix("/api/v1/nodes/") {
        if method == "POST" {
            if let Some(_id) = rest.strip_suffix("/pause") {
                return MessageType::NodePause;
            }
            if let Some(_id) = rest.strip_suffix("/resume") {
                return MessageType::NodeResume;
            }
        }
        if method == "DELETE" && !rest.is_empty() && !rest.contains('/') {
            return MessageType::NodeDelete;
        }
    }

    MessageType::Unknown
}

/// Strips the query string and any trailing slash from a request path.
pub fn normalize_path(path: &str) -> String {
    let without_query = path.split('?').next().unwrap_or("");
    if without_query == "/" {
        return without_query.to_string();
    }
    without_query.trim_end_matches('/').to_string()
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
