//! Event batch envelopes: the content-addressed unit of persistence and
//! transport.
//!
//! One `create` call produces one envelope holding its events in order. The
//! envelope is a MessagePack document `{version, patches}` and is addressed
//! by the SHA-256 digest of its bytes.

use std::io::Cursor;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::action::Action;
use crate::error::{CodecError, CodecResult};
use crate::event::{Event, PatchEvent};
use crate::operation::Operation;

/// Envelope schema version written by this crate.
pub const ENVELOPE_SCHEMA_VERSION: u32 = 1;

/// Multihash prefix for a 32-byte SHA2-256 digest.
const MULTIHASH_SHA2_256: [u8; 2] = [0x12, 0x20];

/// SHA-256 address of an encoded envelope.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ContentId([u8; 32]);

impl ContentId {
    /// Address of `bytes`.
    pub fn digest(bytes: &[u8]) -> Self {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&Sha256::digest(bytes));
        Self(digest)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Self-describing multihash form (`0x12 0x20 || digest`).
    pub fn to_multihash(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(MULTIHASH_SHA2_256.len() + self.0.len());
        out.extend_from_slice(&MULTIHASH_SHA2_256);
        out.extend_from_slice(&self.0);
        out
    }
}

impl core::fmt::Display for ContentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for ContentId {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| CodecError::malformed(format!("content id: {e}")))?;
        let digest: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CodecError::malformed("content id must be 32 bytes"))?;
        Ok(Self(digest))
    }
}

/// Serialized envelope bytes together with their address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEnvelope {
    cid: ContentId,
    bytes: Vec<u8>,
}

impl EncodedEnvelope {
    pub fn cid(&self) -> ContentId {
        self.cid
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Recompute the digest and compare it with the recorded address.
    pub fn verify(&self) -> CodecResult<()> {
        verify_digest(&self.bytes, &self.cid)
    }
}

#[derive(Serialize)]
struct RecordEventsRef<'a> {
    version: u32,
    patches: &'a [PatchEvent],
}

#[derive(Deserialize)]
struct RecordEvents {
    version: u32,
    patches: Vec<PatchEvent>,
}

/// Envelope schema table.
///
/// Built once and shared by reference between encoders and decoders; it holds
/// no mutable state, so one instance may serve any number of threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvelopeCodec {
    schema_version: u32,
}

impl Default for EnvelopeCodec {
    fn default() -> Self {
        Self {
            schema_version: ENVELOPE_SCHEMA_VERSION,
        }
    }
}

impl EnvelopeCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Codec pinned to another schema version (migration tooling, tests).
    pub fn with_schema_version(schema_version: u32) -> Self {
        Self { schema_version }
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Translate `actions` into events stamped with the current wall-clock
    /// time and encode them as one envelope.
    ///
    /// All-or-nothing: the first translation failure is returned and no
    /// events are produced.
    pub fn create(&self, actions: &[Action]) -> CodecResult<(Vec<PatchEvent>, EncodedEnvelope)> {
        self.create_with_clock(actions, Utc::now)
    }

    /// Like [`EnvelopeCodec::create`], reading each event's timestamp from
    /// `clock`.
    ///
    /// The clock is read once per event. Nothing here enforces that successive
    /// readings are non-decreasing.
    pub fn create_with_clock(
        &self,
        actions: &[Action],
        mut clock: impl FnMut() -> DateTime<Utc>,
    ) -> CodecResult<(Vec<PatchEvent>, EncodedEnvelope)> {
        let mut events = Vec::with_capacity(actions.len());
        for action in actions {
            let operation = Operation::from_action(action)?;
            events.push(PatchEvent::new(clock(), action.model_name.clone(), operation));
        }

        let envelope = self.encode(&events)?;
        Ok((events, envelope))
    }

    /// Serialize `events` in order into one addressed envelope.
    pub fn encode(&self, events: &[PatchEvent]) -> CodecResult<EncodedEnvelope> {
        let record = RecordEventsRef {
            version: self.schema_version,
            patches: events,
        };
        let bytes = rmp_serde::to_vec_named(&record).map_err(CodecError::Encode)?;
        let cid = ContentId::digest(&bytes);
        debug!(events = events.len(), bytes = bytes.len(), cid = %cid, "envelope encoded");

        Ok(EncodedEnvelope { cid, bytes })
    }

    /// Parse envelope bytes back into the ordered event list.
    pub fn decode(&self, bytes: &[u8]) -> CodecResult<Vec<PatchEvent>> {
        let mut cursor = Cursor::new(bytes);
        let record: RecordEvents = rmp_serde::from_read(&mut cursor)
            .map_err(|e| CodecError::malformed(e.to_string()))?;

        let consumed = cursor.position() as usize;
        if consumed != bytes.len() {
            return Err(CodecError::malformed(format!(
                "{} trailing bytes after envelope",
                bytes.len() - consumed
            )));
        }
        if record.version != self.schema_version {
            return Err(CodecError::malformed(format!(
                "unsupported schema version {} (expected {})",
                record.version, self.schema_version
            )));
        }

        if let Some(event) = record
            .patches
            .iter()
            .find(|event| event.entity_id() != event.operation().entity_id())
        {
            return Err(CodecError::malformed(format!(
                "event for entity {} carries an operation for entity {}",
                event.entity_id(),
                event.operation().entity_id()
            )));
        }

        Ok(record.patches)
    }

    /// Check the digest of `bytes` against `expected`, then decode.
    pub fn decode_verified(&self, bytes: &[u8], expected: &ContentId) -> CodecResult<Vec<PatchEvent>> {
        verify_digest(bytes, expected)?;
        self.decode(bytes)
    }
}

fn verify_digest(bytes: &[u8], expected: &ContentId) -> CodecResult<()> {
    let found = ContentId::digest(bytes);
    if &found != expected {
        return Err(CodecError::ContentIdMismatch {
            expected: *expected,
            found,
        });
    }
    Ok(())
}
