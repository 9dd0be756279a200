//! Resumable session state.

use super::protocol::{self, GatewayPayload};
use crate::types::DiscordUser;

/// State that survives a reconnect when the session can be resumed.
///
/// Owned by the session manager task; nothing else mutates it.
#[derive(Debug, Default)]
pub(crate) struct Session {
    /// Assigned by `READY`. `None` until identify completes.
    pub(crate) session_id: Option<String>,
    /// Last sequence number seen. 0 before the first dispatch.
    pub(crate) sequence: u64,
    /// Validated `resume_gateway_url` from `READY`.
    pub(crate) resume_url: Option<String>,
    /// The bot's own user from `READY`.
    pub(crate) self_user: Option<DiscordUser>,
}

impl Session {
    /// Record a dispatch sequence number. The stored value never decreases.
    pub(crate) fn observe_sequence(&mut self, seq: u64) {
        self.sequence = self.sequence.max(seq);
    }

    /// Sequence for heartbeats; `None` before the first dispatch.
    pub(crate) fn last_sequence(&self) -> Option<u64> {
        (self.sequence > 0).then_some(self.sequence)
    }

    /// Whether the next handshake should be a resume.
    pub(crate) fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    /// Record a completed identify.
    pub(crate) fn establish(
        &mut self,
        session_id: String,
        resume_url: Option<String>,
        self_user: DiscordUser,
    ) {
        self.session_id = Some(session_id);
        self.resume_url = resume_url.filter(|url| protocol::is_valid_resume_url(url));
        self.self_user = Some(self_user);
    }

    /// Discard everything needed to resume. The next handshake identifies.
    pub(crate) fn clear(&mut self) {
        self.session_id = None;
        self.sequence = 0;
        self.resume_url = None;
    }

    /// URL for the next connection: the resume URL when resuming, else
    /// `default`.
    pub(crate) fn connect_url<'a>(&'a self, default: &'a str) -> &'a str {
        match (&self.session_id, &self.resume_url) {
            (Some(_), Some(url)) => url,
            _ => default,
        }
    }

    /// Resume payload, or `None` when there is nothing to resume.
    pub(crate) fn resume_payload(&self, token: &str) -> Option<GatewayPayload> {
        self.session_id
            .as_deref()
            .map(|id| protocol::resume(token, id, self.sequence))
    }
}
