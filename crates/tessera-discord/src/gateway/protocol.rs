//! Discord Gateway v10 wire format: opcodes, close codes and the control
//! payloads the session sends.

use serde::{Deserialize, Serialize};

use super::intents::Intents;

/// Gateway API version.
pub const GATEWAY_VERSION: u8 = 10;

/// Discord Gateway opcodes.
pub mod opcode {
    /// Event dispatch (receive only).
    pub const DISPATCH: u8 = 0;
    /// Heartbeat (bidirectional).
    pub const HEARTBEAT: u8 = 1;
    /// Identify (send only).
    pub const IDENTIFY: u8 = 2;
    /// Resume (send only).
    pub const RESUME: u8 = 6;
    /// Server requests reconnect (receive only).
    pub const RECONNECT: u8 = 7;
    /// Invalid session (receive only).
    pub const INVALID_SESSION: u8 = 9;
    /// Hello, carries the heartbeat interval (receive only).
    pub const HELLO: u8 = 10;
    /// Heartbeat ACK (receive only).
    pub const HEARTBEAT_ACK: u8 = 11;
}

/// Close codes with special handling.
pub mod close_code {
    /// Normal closure. The session is invalidated.
    pub const NORMAL: u16 = 1000;
    /// Going away. The session is invalidated.
    pub const GOING_AWAY: u16 = 1001;
    /// Close sent by the client when it wants to resume afterwards.
    pub const RESUMABLE: u16 = 4000;
    /// Bad token.
    pub const AUTHENTICATION_FAILED: u16 = 4004;
    /// Resumed with an invalid sequence.
    pub const INVALID_SEQUENCE: u16 = 4007;
    /// Session timed out.
    pub const SESSION_TIMED_OUT: u16 = 4009;
    /// Invalid shard.
    pub const INVALID_SHARD: u16 = 4010;
    /// Sharding required.
    pub const SHARDING_REQUIRED: u16 = 4011;
    /// Invalid API version.
    pub const INVALID_API_VERSION: u16 = 4012;
    /// Invalid intents value.
    pub const INVALID_INTENTS: u16 = 4013;
    /// Disallowed intents (not enabled in the developer portal).
    pub const DISALLOWED_INTENTS: u16 = 4014;
}

/// How a close code is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseAction {
    /// Stop: bad token.
    AuthenticationFailed,
    /// Stop: the session configuration is rejected.
    InvalidConfiguration,
    /// Discard the session and identify again.
    Reidentify,
    /// Reconnect and resume if a session is held.
    Resume,
}

/// Classify a close code received from the gateway.
#[must_use]
pub fn classify_close_code(code: u16) -> CloseAction {
    use close_code::{
        AUTHENTICATION_FAILED, DISALLOWED_INTENTS, GOING_AWAY, INVALID_API_VERSION, INVALID_INTENTS,
        INVALID_SEQUENCE, INVALID_SHARD, NORMAL, SESSION_TIMED_OUT, SHARDING_REQUIRED,
    };

    match code {
        AUTHENTICATION_FAILED => CloseAction::AuthenticationFailed,
        INVALID_SHARD | SHARDING_REQUIRED | INVALID_API_VERSION | INVALID_INTENTS
        | DISALLOWED_INTENTS => CloseAction::InvalidConfiguration,
        INVALID_SEQUENCE | SESSION_TIMED_OUT | NORMAL | GOING_AWAY => CloseAction::Reidentify,
        _ => CloseAction::Resume,
    }
}

/// Raw gateway payload as received/sent over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayload {
    /// Opcode.
    pub op: u8,
    /// Event data (opcode-dependent).
    #[serde(default)]
    pub d: Option<serde_json::Value>,
    /// Sequence number (dispatch only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
    /// Event name (dispatch only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
}

/// Hello payload (`op=10`).
#[derive(Debug, Deserialize)]
pub(crate) struct HelloPayload {
    /// Heartbeat interval in milliseconds.
    pub heartbeat_interval: u64,
}

fn control(op: u8, d: serde_json::Value) -> GatewayPayload {
    GatewayPayload {
        op,
        d: Some(d),
        s: None,
        t: None,
    }
}

/// Build an Identify payload (`op=2`).
#[must_use]
pub fn identify(token: &str, intents: Intents) -> GatewayPayload {
    control(
        opcode::IDENTIFY,
        serde_json::json!({
            "token": token,
            "intents": intents.bits(),
            "properties": {
                "os": std::env::consts::OS,
                "browser": "tessera",
                "device": "tessera",
            },
        }),
    )
}

/// Build a Resume payload (`op=6`).
#[must_use]
pub fn resume(token: &str, session_id: &str, sequence: u64) -> GatewayPayload {
    control(
        opcode::RESUME,
        serde_json::json!({
            "token": token,
            "session_id": session_id,
            "seq": sequence,
        }),
    )
}

/// Build a Heartbeat payload (`op=1`). `None` is sent as `null`.
#[must_use]
pub fn heartbeat(sequence: Option<u64>) -> GatewayPayload {
    control(
        opcode::HEARTBEAT,
        sequence.map_or(serde_json::Value::Null, serde_json::Value::from),
    )
}

/// Append the version and encoding query to a gateway URL.
#[must_use]
pub fn with_query(url: &str) -> String {
    let url = url.trim_end_matches('/');
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}v={GATEWAY_VERSION}&encoding=json")
}

/// Domains a resume gateway URL may point at.
const ALLOWED_RESUME_DOMAINS: &[&str] = &["discord.gg"];

/// Validate that a resume gateway URL is a `wss://` URL on a Discord host.
#[must_use]
pub fn is_valid_resume_url(url: &str) -> bool {
    let Some(rest) = url.strip_prefix("wss://") else {
        return false;
    };
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .split(':')
        .next()
        .unwrap_or_default();
    ALLOWED_RESUME_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identify_payload_shape() {
        let payload = identify("T", Intents::BASE);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["op"], 2);
        assert_eq!(json["d"]["token"], "T");
        assert_eq!(json["d"]["intents"], Intents::BASE.bits());
        assert_eq!(json["d"]["properties"]["browser"], "tessera");
        assert!(json.get("s").is_none());
        assert!(json.get("t").is_none());
    }

    #[test]
    fn resume_payload_shape() {
        let json = serde_json::to_value(resume("T", "abc123", 7)).unwrap();
        assert_eq!(json["op"], 6);
        assert_eq!(json["d"]["session_id"], "abc123");
        assert_eq!(json["d"]["seq"], 7);
        assert!(json["d"].get("intents").is_none());
    }

    #[test]
    fn heartbeat_null_before_first_dispatch() {
        let json = serde_json::to_value(heartbeat(None)).unwrap();
        assert_eq!(json["op"], 1);
        assert!(json["d"].is_null());
        let json = serde_json::to_value(heartbeat(Some(42))).unwrap();
        assert_eq!(json["d"], 42);
    }

    #[test]
    fn payload_parses_dispatch() {
        let payload: GatewayPayload =
            serde_json::from_str(r#"{"op":0,"d":{"x":1},"s":5,"t":"MESSAGE_CREATE"}"#).unwrap();
        assert_eq!(payload.op, opcode::DISPATCH);
        assert_eq!(payload.s, Some(5));
        assert_eq!(payload.t.as_deref(), Some("MESSAGE_CREATE"));
    }

    #[test]
    fn payload_parses_null_fields() {
        let payload: GatewayPayload =
            serde_json::from_str(r#"{"op":11,"d":null,"s":null,"t":null}"#).unwrap();
        assert_eq!(payload.op, opcode::HEARTBEAT_ACK);
        assert!(payload.d.is_none());
        assert!(payload.s.is_none());
    }

    #[test]
    fn close_code_classes() {
        assert_eq!(classify_close_code(4004), CloseAction::AuthenticationFailed);
        for code in [4010, 4011, 4012, 4013, 4014] {
            assert_eq!(classify_close_code(code), CloseAction::InvalidConfiguration);
        }
        for code in [4007, 4009, 1000, 1001] {
            assert_eq!(classify_close_code(code), CloseAction::Reidentify);
        }
        for code in [4000, 4001, 4008, 1006, 1011] {
            assert_eq!(classify_close_code(code), CloseAction::Resume);
        }
    }

    #[test]
    fn query_is_appended() {
        assert_eq!(
            with_query("wss://gateway.discord.gg"),
            "wss://gateway.discord.gg?v=10&encoding=json"
        );
        assert_eq!(
            with_query("wss://gateway.discord.gg/"),
            "wss://gateway.discord.gg?v=10&encoding=json"
        );
        assert_eq!(
            with_query("ws://localhost:9000/?compress=false"),
            "ws://localhost:9000/?compress=false&v=10&encoding=json"
        );
    }

    #[test]
    fn resume_url_validation() {
        assert!(is_valid_resume_url("wss://gateway-us-east1-b.discord.gg"));
        assert!(is_valid_resume_url("wss://discord.gg/"));
        assert!(is_valid_resume_url("wss://gateway.discord.gg:443/?v=10"));
        assert!(!is_valid_resume_url("ws://gateway.discord.gg"));
        assert!(!is_valid_resume_url("wss://evil.com"));
        assert!(!is_valid_resume_url("wss://discord.gg.evil.com"));
        assert!(!is_valid_resume_url("wss://notdiscord.gg"));
        assert!(!is_valid_resume_url(""));
    }
}
