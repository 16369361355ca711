//! Batch-RPC wire protocol of the notebook service.
//!
//! Pure and stateless: request encoding, response envelope decoding, and
//! schema-tolerant searches over the decoded payloads.

pub mod envelope;
pub mod procedures;
pub mod walk;

pub use envelope::{decode_response, encode_request, strip_hijack_prefix, HIJACK_PREFIX};
pub use procedures::{ProcedureId, INFOGRAPHIC_TOOL_TYPE};
pub use walk::{collect_identifiers, find_artifact_url, find_identifier_like, is_identifier_like};
