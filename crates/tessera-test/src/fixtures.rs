//! Gateway payloads and Discord objects for tests.

use serde_json::{Value, json};
use tessera_discord::gateway::GatewayConfig;

/// Token used by [`test_gateway_config`].
pub const TEST_TOKEN: &str = "T";

/// Bot user id used by [`ready`].
pub const BOT_USER_ID: &str = "100";

/// Gateway configuration with the test token and a short, deterministic
/// backoff.
#[must_use]
pub fn test_gateway_config() -> GatewayConfig {
    let mut config = GatewayConfig::new(TEST_TOKEN);
    config.backoff_base_ms = 100;
    config.backoff_max_ms = 1_000;
    config
}

/// `op 10` Hello.
#[must_use]
pub fn hello(heartbeat_interval: u64) -> Value {
    json!({"op": 10, "d": {"heartbeat_interval": heartbeat_interval}})
}

/// `op 11` heartbeat ACK.
#[must_use]
pub fn heartbeat_ack() -> Value {
    json!({"op": 11})
}

/// `op 1` heartbeat request.
#[must_use]
pub fn heartbeat_request() -> Value {
    json!({"op": 1, "d": null})
}

/// `op 7` reconnect request.
#[must_use]
pub fn reconnect() -> Value {
    json!({"op": 7, "d": null})
}

/// `op 9` invalid session.
#[must_use]
pub fn invalid_session(resumable: bool) -> Value {
    json!({"op": 9, "d": resumable})
}

/// `op 0` dispatch.
#[must_use]
pub fn dispatch(name: &str, seq: u64, data: Value) -> Value {
    json!({"op": 0, "t": name, "s": seq, "d": data})
}

/// `READY` dispatch for [`BOT_USER_ID`].
#[must_use]
pub fn ready(session_id: &str, seq: u64) -> Value {
    dispatch(
        "READY",
        seq,
        json!({
            "v": 10,
            "session_id": session_id,
            "resume_gateway_url": "wss://gateway-us-east1-b.discord.gg",
            "user": user(BOT_USER_ID, "tessera"),
            "guilds": [],
        }),
    )
}

/// `RESUMED` dispatch.
#[must_use]
pub fn resumed(seq: u64) -> Value {
    dispatch("RESUMED", seq, json!({}))
}

/// Discord user object.
#[must_use]
pub fn user(id: &str, username: &str) -> Value {
    json!({"id": id, "username": username, "global_name": null, "avatar": null})
}

/// Discord guild message object.
#[must_use]
pub fn message(id: &str, channel_id: &str, content: &str) -> Value {
    json!({
        "id": id,
        "channel_id": channel_id,
        "guild_id": "g1",
        "author": user("200", "alice"),
        "content": content,
        "timestamp": "2024-01-01T00:00:00+00:00",
        "edited_timestamp": null,
        "attachments": [],
        "embeds": [],
    })
}

/// `MESSAGE_CREATE` dispatch.
#[must_use]
pub fn message_create(seq: u64, id: &str, channel_id: &str, content: &str) -> Value {
    dispatch("MESSAGE_CREATE", seq, message(id, channel_id, content))
}
