//! Merge-patch events: action translation and envelope coding.
//!
//! ```text
//! Action ──translate──▶ Operation ──stamp──▶ PatchEvent ──encode──▶ envelope bytes
//!                                                 ▲                        │
//!                                                 └─────────decode─────────┘
//! ```
//!
//! Everything here is pure and stateless; replaying events against a store
//! lives in `patchlog-infra`.

pub mod action;
pub mod envelope;
pub mod error;
pub mod event;
pub mod operation;

pub use action::{Action, ActionKind, StateSide};
pub use envelope::{ContentId, ENVELOPE_SCHEMA_VERSION, EncodedEnvelope, EnvelopeCodec};
pub use error::{CodecError, CodecResult};
pub use event::{Event, PatchEvent};
pub use operation::{Operation, OperationKind, UnknownCode};
