use scan_relay_common::payload::DecodedPayload;
use tracing::debug;

/// Suppresses reporting of a payload that is identical to the last accepted one.
///
/// Only the most recent value is remembered: `A, B, A` is reported three
/// times, `A, A` once.
#[derive(Debug, Default)]
pub struct DedupGate {
    last_seen: Option<DecodedPayload>,
}

impl DedupGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `candidate` differs from the held value, and holds it.
    pub fn consider(&mut self, candidate: &DecodedPayload) -> bool {
        match &self.last_seen {
            Some(held) if held == candidate => {
                debug!(payload = %candidate, "payload unchanged, suppressing");
                false
            }
            _ => {
                debug!(
                    payload = %candidate,
                    previous = self.last_seen.as_ref().map(DecodedPayload::as_str),
                    "new payload accepted"
                );
                self.last_seen = Some(candidate.clone());
                true
            }
        }
    }

    pub fn last_seen(&self) -> Option<&DecodedPayload> {
        self.last_seen.as_ref()
    }
}
