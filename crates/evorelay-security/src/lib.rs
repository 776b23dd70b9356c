pub mod redaction;

pub use redaction::{Redacted, RedactingWriter, redact_secrets};
