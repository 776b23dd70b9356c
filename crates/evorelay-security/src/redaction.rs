use std::io::{self, Write};

use tracing_subscriber::fmt::MakeWriter;

/// Wraps a [`MakeWriter`] so every formatted log line passes through
/// [`redact_secrets`] before it reaches the sink.
pub struct RedactingWriter<M> {
    make_inner: M,
}

impl RedactingWriter<fn() -> io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr as fn() -> io::Stderr)
    }
}

impl<M> RedactingWriter<M> {
    pub fn new(make_inner: M) -> Self {
        Self { make_inner }
    }
}

impl<'a, M> MakeWriter<'a> for RedactingWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = Redacted<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        Redacted {
            inner: self.make_inner.make_writer(),
        }
    }
}

/// Per-event writer handed out by [`RedactingWriter`].
pub struct Redacted<W> {
    inner: W,
}

impl<W: Write> Write for Redacted<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let original = String::from_utf8_lossy(buf);
        self.inner.write_all(redact_secrets(&original).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Replace known secret patterns with `[REDACTED]`.
///
/// Key/value style secrets (`apikey=...`, `"apikey":"..."`) keep their key so
/// the log line stays readable.
pub fn redact_secrets(input: &str) -> String {
    static TOKENS: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
        regex::Regex::new(
            r"(?x)
              sk-proj-\S{10,}      # OpenAI project keys
            | sk-\S{20,}           # OpenAI-style keys
            | Bearer\s+[A-Za-z0-9._\-]{16,}  # Authorization header values
            ",
        )
        .expect("redaction regex should compile")
    });
    static KEY_VALUES: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
        regex::Regex::new(r#"(?i)("?(?:apikey|api_key|password)"?\s*[=:]\s*"?)[^"\s,&}]+"#)
            .expect("key/value redaction regex should compile")
    });

    let redacted = TOKENS.replace_all(input, "[REDACTED]");
    KEY_VALUES
        .replace_all(&redacted, "${1}[REDACTED]")
        .into_owned()
}
