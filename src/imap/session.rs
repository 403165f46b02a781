//! One-shot IMAP session: login, examine, fetch the recent window, logout.
//!
//! A deliberately small IMAP4rev1 client: tagged commands over a blocking
//! stream, with just enough fetch-response parsing (literals and quoted
//! strings) to stream header and body sections into the assembler. The
//! session is generic over the stream so tests can drive it with a
//! scripted transcript instead of a live connection.

use std::fmt;
use std::io::{Read, Write};
use std::time::Duration;

use secrecy::ExposeSecret;
use tracing::{debug, warn};

use crate::error::ImapError;
use crate::imap::assembler::MessageAssembler;
use crate::imap::transport::{ConnectionDescriptor, Transport};
use crate::record::{self, EmailRecord};
use crate::score::ScoringStrategy;

/// Fixed fetch window: the most recent N messages by sequence number.
pub const FETCH_WINDOW: u32 = 10;

/// Literal payloads are streamed to the assembler in chunks of this size.
const CHUNK_SIZE: usize = 2048;

/// Session lifecycle. `Failed` is reachable from every state except
/// `Idle` and `Done`; both `Done` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Ready,
    InboxOpen,
    Fetching,
    Done,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Ready => "ready",
            Self::InboxOpen => "inbox-open",
            Self::Fetching => "fetching",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Sequence range covering the most recent [`FETCH_WINDOW`] messages.
pub fn fetch_window(total: u32) -> (u32, u32) {
    (total.saturating_sub(FETCH_WINDOW - 1).max(1), total)
}

/// Which of a message's two streams a fetch section feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamKind {
    Header,
    Body,
}

pub struct ImapSession<S: Read + Write> {
    stream: S,
    state: SessionState,
    tag_seq: u32,
}

impl<S: Read + Write> ImapSession<S> {
    /// Take ownership of a connected stream. The server greeting has not
    /// been read yet.
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            state: SessionState::Connecting,
            tag_seq: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn fail<T>(&mut self, err: ImapError) -> Result<T, ImapError> {
        self.state = SessionState::Failed;
        Err(err)
    }

    fn next_tag(&mut self) -> String {
        self.tag_seq += 1;
        format!("A{}", self.tag_seq)
    }

    /// Read one CRLF-terminated line, without the terminator.
    fn read_line(&mut self) -> std::io::Result<String> {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let n = self.stream.read(&mut byte)?;
            if n == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "connection closed",
                ));
            }
            buf.push(byte[0]);
            if buf.ends_with(b"\r\n") {
                buf.truncate(buf.len() - 2);
                return Ok(String::from_utf8_lossy(&buf).into_owned());
            }
        }
    }

    /// Send one tagged command and collect response lines up to and
    /// including the tagged completion.
    fn command(&mut self, cmd: &str) -> std::io::Result<Vec<String>> {
        let tag = self.next_tag();
        self.stream
            .write_all(format!("{tag} {cmd}\r\n").as_bytes())?;
        self.stream.flush()?;

        let mut lines = Vec::new();
        loop {
            let line = self.read_line()?;
            let done = is_tagged(&line, &tag);
            lines.push(line);
            if done {
                return Ok(lines);
            }
        }
    }

    /// Read the greeting and authenticate. Failures here are connection
    /// errors: bad host, bad credentials, and network trouble all surface
    /// as one opaque category.
    pub fn login(&mut self, username: &str, password: &secrecy::SecretString) -> Result<(), ImapError> {
        let greeting = match self.read_line() {
            Ok(line) => line,
            Err(e) => return self.fail(ImapError::Connect(e.to_string())),
        };
        if !greeting.starts_with("* OK") && !greeting.starts_with("* PREAUTH") {
            return self.fail(ImapError::Connect(format!(
                "unexpected greeting: {greeting}"
            )));
        }

        let cmd = format!("LOGIN {} {}", quoted(username), quoted(password.expose_secret()));
        let lines = match self.command(&cmd) {
            Ok(lines) => lines,
            Err(e) => return self.fail(ImapError::Connect(e.to_string())),
        };
        if !completed_ok(&lines) {
            return self.fail(ImapError::Connect("authentication rejected".into()));
        }

        self.state = SessionState::Ready;
        debug!(state = %self.state, "authenticated");
        Ok(())
    }

    /// Select INBOX read-only (EXAMINE never mutates flags). Returns the
    /// total message count from the `* n EXISTS` response.
    pub fn examine_inbox(&mut self) -> Result<u32, ImapError> {
        let lines = match self.command("EXAMINE INBOX") {
            Ok(lines) => lines,
            Err(e) => return self.fail(ImapError::InboxOpen(e.to_string())),
        };
        if !completed_ok(&lines) {
            return self.fail(ImapError::InboxOpen("EXAMINE rejected".into()));
        }

        let mut total = None;
        for line in &lines {
            let mut parts = line.split_whitespace();
            if parts.next() == Some("*")
                && let Some(count) = parts.next()
                && parts.next() == Some("EXISTS")
                && let Ok(n) = count.parse::<u32>()
            {
                total = Some(n);
            }
        }

        match total {
            Some(n) => {
                self.state = SessionState::InboxOpen;
                debug!(state = %self.state, total = n, "inbox selected");
                Ok(n)
            }
            None => self.fail(ImapError::InboxOpen(
                "no EXISTS count in EXAMINE response".into(),
            )),
        }
    }

    /// Fetch the recent window and assemble one record per message.
    /// `total` must be at least 1. Records are returned in arrival order.
    pub fn fetch_recent(
        &mut self,
        total: u32,
        scoring: &dyn ScoringStrategy,
    ) -> Result<Vec<EmailRecord>, ImapError> {
        let (start, end) = fetch_window(total);
        self.state = SessionState::Fetching;

        // BODY.PEEK keeps the fetch from setting \Seen, regardless of how
        // the mailbox was selected.
        let tag = self.next_tag();
        let cmd = format!(
            "{tag} FETCH {start}:{end} (BODY.PEEK[HEADER.FIELDS (FROM TO SUBJECT DATE)] BODY.PEEK[1])\r\n"
        );
        if let Err(e) = self
            .stream
            .write_all(cmd.as_bytes())
            .and_then(|()| self.stream.flush())
        {
            return self.fail(ImapError::Fetch(e.to_string()));
        }
        debug!(start, end, "fetch issued");

        let mut assembler = MessageAssembler::new();
        let mut records = Vec::new();
        loop {
            let line = match self.read_line() {
                Ok(line) => line,
                Err(e) => return self.fail(ImapError::Fetch(e.to_string())),
            };
            if is_tagged(&line, &tag) {
                if line.split_whitespace().nth(1) != Some("OK") {
                    return self.fail(ImapError::Fetch(line));
                }
                break;
            }
            if let Some((seqno, rest)) = parse_untagged_fetch(&line) {
                if let Err(e) = self.process_fetch_group(seqno, rest, &mut assembler) {
                    return self.fail(ImapError::Fetch(e.to_string()));
                }
                // The group's closing parenthesis is the message-end signal.
                records.push(assembler.message_end(seqno, scoring));
            }
            // Other untagged responses (EXISTS updates, flag changes) are
            // irrelevant to a read-only one-shot session.
        }

        let unfinished = assembler.unfinished();
        if !unfinished.is_empty() {
            warn!(?unfinished, "messages never completed and were dropped");
        }
        Ok(records)
    }

    /// Parse one `* <seq> FETCH (...)` group, streaming section payloads
    /// into the assembler. Returns once the closing parenthesis is seen.
    fn process_fetch_group(
        &mut self,
        seqno: u32,
        first_line: String,
        assembler: &mut MessageAssembler,
    ) -> std::io::Result<()> {
        let mut cursor = first_line;
        let mut i = 0;
        loop {
            while cursor[i..].starts_with(' ') {
                i += 1;
            }
            if i >= cursor.len() {
                // Group continues on the next line.
                cursor = self.read_line()?;
                i = 0;
                continue;
            }
            let rest = &cursor[i..];
            if rest.starts_with(')') {
                return Ok(());
            }

            if let Some(after) = rest.strip_prefix("BODY[") {
                let Some(close) = after.find(']') else {
                    return Err(malformed("unterminated BODY section"));
                };
                let kind = if after[..close].contains("HEADER") {
                    StreamKind::Header
                } else {
                    StreamKind::Body
                };
                i += "BODY[".len() + close + 1;
                while cursor[i..].starts_with(' ') {
                    i += 1;
                }
                let payload = &cursor[i..];

                if let Some(len) = literal_len(payload) {
                    // A literal marker always terminates its line; the
                    // group resumes on the line after the payload.
                    self.stream_literal(seqno, kind, len, assembler)?;
                    cursor = self.read_line()?;
                    i = 0;
                } else if payload.starts_with('"') {
                    let (value, consumed) =
                        parse_quoted(payload).ok_or_else(|| malformed("unterminated quoted string"))?;
                    match kind {
                        StreamKind::Header => {
                            assembler.header_chunk(seqno, value.as_bytes());
                            assembler.header_end(seqno);
                        }
                        StreamKind::Body => {
                            assembler.body_chunk(seqno, value.as_bytes());
                            assembler.body_end(seqno);
                        }
                    }
                    i += consumed;
                } else if payload.starts_with("NIL") {
                    match kind {
                        StreamKind::Header => assembler.header_end(seqno),
                        StreamKind::Body => assembler.body_end(seqno),
                    }
                    i += "NIL".len();
                } else {
                    return Err(malformed("unsupported BODY payload"));
                }
            } else {
                // Attribute we did not ask for (UID, FLAGS, ...); skip it.
                i += skip_item_len(rest);
            }
        }
    }

    /// Read a literal's bytes off the wire in bounded chunks, feeding the
    /// assembler as they arrive, then signal that stream's end.
    fn stream_literal(
        &mut self,
        seqno: u32,
        kind: StreamKind,
        len: usize,
        assembler: &mut MessageAssembler,
    ) -> std::io::Result<()> {
        let mut buf = [0u8; CHUNK_SIZE];
        let mut remaining = len;
        while remaining > 0 {
            let want = remaining.min(CHUNK_SIZE);
            self.stream.read_exact(&mut buf[..want])?;
            match kind {
                StreamKind::Header => assembler.header_chunk(seqno, &buf[..want]),
                StreamKind::Body => assembler.body_chunk(seqno, &buf[..want]),
            }
            remaining -= want;
        }
        match kind {
            StreamKind::Header => assembler.header_end(seqno),
            StreamKind::Body => assembler.body_end(seqno),
        }
        Ok(())
    }

    /// Best-effort LOGOUT. Dropping the session closes the socket either
    /// way; this just lets well-behaved servers log a clean bye.
    pub fn logout(&mut self) {
        let _ = self.command("LOGOUT");
        if self.state != SessionState::Failed {
            self.state = SessionState::Done;
        }
    }
}

/// Run one complete session over an established stream: login, examine,
/// fetch, logout, sort. Every exit path drops the stream, closing the
/// connection — errors never leave it open.
pub fn run_session<S: Read + Write>(
    stream: S,
    desc: &ConnectionDescriptor,
    scoring: &dyn ScoringStrategy,
) -> Result<Vec<EmailRecord>, ImapError> {
    let mut session = ImapSession::new(stream);
    session.login(&desc.username, &desc.password)?;

    let total = session.examine_inbox()?;
    if total == 0 {
        // Empty mailbox short-circuits: no fetch is issued.
        session.logout();
        return Ok(Vec::new());
    }

    let mut records = session.fetch_recent(total, scoring)?;
    session.logout();

    record::sort_by_date_desc(&mut records);
    Ok(records)
}

/// Open a connection and run one complete fetch. Blocking — callers on a
/// runtime should run this on the blocking pool.
pub fn fetch_inbox(
    desc: &ConnectionDescriptor,
    scoring: &dyn ScoringStrategy,
    timeout: Duration,
) -> Result<Vec<EmailRecord>, ImapError> {
    let transport = Transport::connect(desc, timeout)?;
    run_session(transport, desc, scoring)
}

// ── Response parsing helpers ────────────────────────────────────────

fn is_tagged(line: &str, tag: &str) -> bool {
    line.starts_with(tag) && line.as_bytes().get(tag.len()) == Some(&b' ')
}

fn completed_ok(lines: &[String]) -> bool {
    lines
        .last()
        .is_some_and(|l| l.split_whitespace().nth(1) == Some("OK"))
}

/// IMAP quoted string, escaping `"` and `\`.
fn quoted(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// `* <seq> FETCH (<rest>` → (seq, rest).
fn parse_untagged_fetch(line: &str) -> Option<(u32, String)> {
    let rest = line.strip_prefix("* ")?;
    let (num, rest) = rest.split_once(' ')?;
    let seqno = num.parse().ok()?;
    let rest = rest.strip_prefix("FETCH")?.trim_start().strip_prefix('(')?;
    Some((seqno, rest.to_string()))
}

/// `{N}` at the end of a line → N.
fn literal_len(payload: &str) -> Option<usize> {
    payload
        .strip_prefix('{')?
        .strip_suffix('}')?
        .parse()
        .ok()
}

/// Parse a leading quoted string; returns (value, bytes consumed).
fn parse_quoted(s: &str) -> Option<(String, usize)> {
    let mut out = String::new();
    let mut escaped = false;
    for (idx, c) in s.char_indices().skip(1) {
        if escaped {
            out.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '"' => return Some((out, idx + 1)),
            _ => out.push(c),
        }
    }
    None
}

/// Length of one atom or parenthesized list at the head of `rest`.
fn skip_item_len(rest: &str) -> usize {
    if rest.starts_with('(') {
        let mut depth = 0usize;
        for (idx, c) in rest.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return idx + 1;
                    }
                }
                _ => {}
            }
        }
        rest.len()
    } else {
        rest.find([' ', ')']).unwrap_or(rest.len())
    }
}

fn malformed(detail: &str) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::InvalidData, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::{Score, ScoringStrategy};
    use std::io::Cursor;

    struct FixedScoring;

    impl ScoringStrategy for FixedScoring {
        fn score(&self, _from: &str, _subject: &str, _preview: &str) -> Score {
            Score {
                importance: 10,
                read_status: true,
                categories: vec!["Inbox".to_string()],
            }
        }
    }

    /// A stream fed from a pre-recorded server transcript, recording what
    /// the client writes.
    struct ScriptedStream {
        input: Cursor<Vec<u8>>,
        written: Vec<u8>,
    }

    impl ScriptedStream {
        fn new(script: impl Into<Vec<u8>>) -> Self {
            Self {
                input: Cursor::new(script.into()),
                written: Vec::new(),
            }
        }
    }

    impl Read for ScriptedStream {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for ScriptedStream {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn descriptor() -> ConnectionDescriptor {
        ConnectionDescriptor {
            host: "imap.example.com".into(),
            port: 143,
            username: "user@example.com".into(),
            password: secrecy::SecretString::from("hunter2"),
            use_ssl: false,
        }
    }

    fn fetch_group(seqno: u32, header: &str, body: &str) -> String {
        format!(
            "* {seqno} FETCH (BODY[HEADER.FIELDS (FROM TO SUBJECT DATE)] {{{}}}\r\n{header} BODY[1] {{{}}}\r\n{body})\r\n",
            header.len(),
            body.len(),
        )
    }

    fn script_with_messages(messages: &[(u32, &str, &str)]) -> String {
        let mut script = String::new();
        script.push_str("* OK IMAP4rev1 Service Ready\r\n");
        script.push_str("A1 OK LOGIN completed\r\n");
        script.push_str(&format!(
            "* {} EXISTS\r\n* 0 RECENT\r\nA2 OK [READ-ONLY] EXAMINE completed\r\n",
            messages.len()
        ));
        for (seqno, header, body) in messages {
            script.push_str(&fetch_group(*seqno, header, body));
        }
        script.push_str("A3 OK FETCH completed\r\n");
        script.push_str("* BYE logging out\r\nA4 OK LOGOUT completed\r\n");
        script
    }

    // ── fetch_window ────────────────────────────────────────────────

    #[test]
    fn window_covers_whole_small_mailbox() {
        assert_eq!(fetch_window(1), (1, 1));
        assert_eq!(fetch_window(5), (1, 5));
        assert_eq!(fetch_window(10), (1, 10));
    }

    #[test]
    fn window_slides_over_large_mailbox() {
        assert_eq!(fetch_window(11), (2, 11));
        assert_eq!(fetch_window(25), (16, 25));
    }

    // ── full session ────────────────────────────────────────────────

    #[test]
    fn fetches_and_sorts_three_messages() {
        let script = script_with_messages(&[
            (1, "From: a@x.com\r\nSubject: Hi\r\nDate: 2024-01-01\r\n\r\n", "Hello from a"),
            (2, "From: b@x.com\r\nDate: 2024-01-03\r\n\r\n", "Hello from b"),
            (3, "From: c@x.com\r\nSubject: Yo\r\nDate: 2024-01-02\r\n\r\n", "Hello from c"),
        ]);
        let records = run_session(ScriptedStream::new(script), &descriptor(), &FixedScoring).unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].from, "b@x.com");
        assert_eq!(records[0].subject, "(No Subject)");
        assert_eq!(records[0].id, "email-2");
        assert_eq!(records[1].from, "c@x.com");
        assert_eq!(records[1].subject, "Yo");
        assert_eq!(records[2].from, "a@x.com");
        assert_eq!(records[2].preview, "Hello from a");
    }

    #[test]
    fn fetch_command_uses_peek_and_examine() {
        let script = script_with_messages(&[(
            1,
            "From: a@x.com\r\nSubject: Hi\r\nDate: 2024-01-01\r\n\r\n",
            "Hello",
        )]);
        let mut stream = ScriptedStream::new(script);
        {
            let mut session = ImapSession::new(&mut stream);
            session.login("user@example.com", &secrecy::SecretString::from("hunter2")).unwrap();
            let total = session.examine_inbox().unwrap();
            session.fetch_recent(total, &FixedScoring).unwrap();
            session.logout();
        }
        let written = String::from_utf8(stream.written).unwrap();
        assert!(written.contains("EXAMINE INBOX"));
        assert!(written.contains("FETCH 1:1 (BODY.PEEK[HEADER.FIELDS (FROM TO SUBJECT DATE)] BODY.PEEK[1])"));
        assert!(written.contains("LOGOUT"));
        assert!(written.contains("LOGIN \"user@example.com\" \"hunter2\""));
    }

    #[test]
    fn empty_mailbox_short_circuits_without_fetch() {
        let script = "* OK ready\r\nA1 OK LOGIN completed\r\n\
                      * 0 EXISTS\r\nA2 OK [READ-ONLY] EXAMINE completed\r\n\
                      * BYE\r\nA3 OK LOGOUT completed\r\n";
        let mut stream = ScriptedStream::new(script);
        let records = run_session(&mut stream, &descriptor(), &FixedScoring).unwrap();
        assert!(records.is_empty());
        let written = String::from_utf8(stream.written).unwrap();
        assert!(!written.contains("FETCH"));
        assert!(written.contains("LOGOUT"));
    }

    #[test]
    fn rejected_login_is_a_connect_error() {
        let script = "* OK ready\r\nA1 NO [AUTHENTICATIONFAILED] invalid credentials\r\n";
        let mut stream = ScriptedStream::new(script);
        let err = run_session(&mut stream, &descriptor(), &FixedScoring).unwrap_err();
        assert!(matches!(err, ImapError::Connect(_)));
        let written = String::from_utf8(stream.written).unwrap();
        assert!(!written.contains("EXAMINE"));
    }

    #[test]
    fn rejected_examine_is_an_inbox_error() {
        let script = "* OK ready\r\nA1 OK LOGIN completed\r\nA2 NO EXAMINE failed\r\n";
        let err = run_session(ScriptedStream::new(script), &descriptor(), &FixedScoring).unwrap_err();
        assert!(matches!(err, ImapError::InboxOpen(_)));
    }

    #[test]
    fn examine_without_exists_is_an_inbox_error() {
        let script = "* OK ready\r\nA1 OK LOGIN completed\r\nA2 OK EXAMINE completed\r\n";
        let err = run_session(ScriptedStream::new(script), &descriptor(), &FixedScoring).unwrap_err();
        assert!(matches!(err, ImapError::InboxOpen(_)));
    }

    #[test]
    fn truncated_fetch_is_a_fetch_error() {
        // Literal promises 50 bytes but the stream ends early.
        let script = "* OK ready\r\nA1 OK LOGIN completed\r\n\
                      * 1 EXISTS\r\nA2 OK EXAMINE completed\r\n\
                      * 1 FETCH (BODY[HEADER.FIELDS (FROM TO SUBJECT DATE)] {50}\r\nFrom: a@x.com\r\n";
        let err = run_session(ScriptedStream::new(script), &descriptor(), &FixedScoring).unwrap_err();
        assert!(matches!(err, ImapError::Fetch(_)));
    }

    #[test]
    fn tagged_no_on_fetch_is_a_fetch_error() {
        let script = "* OK ready\r\nA1 OK LOGIN completed\r\n\
                      * 1 EXISTS\r\nA2 OK EXAMINE completed\r\n\
                      A3 NO FETCH failed\r\n";
        let err = run_session(ScriptedStream::new(script), &descriptor(), &FixedScoring).unwrap_err();
        assert!(matches!(err, ImapError::Fetch(_)));
    }

    #[test]
    fn large_body_streams_in_chunks_and_previews_to_300() {
        let body = "z".repeat(5000);
        let script = script_with_messages(&[(
            1,
            "From: big@x.com\r\nSubject: Large\r\nDate: 2024-01-01\r\n\r\n",
            body.as_str(),
        )]);
        let records = run_session(ScriptedStream::new(script), &descriptor(), &FixedScoring).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].preview.chars().count(), 300);
    }

    #[test]
    fn unrequested_attributes_are_skipped() {
        // Server volunteers FLAGS and UID alongside the requested sections.
        let header = "From: a@x.com\r\nSubject: Hi\r\nDate: 2024-01-01\r\n\r\n";
        let body = "Hello";
        let group = format!(
            "* 1 FETCH (FLAGS (\\Seen) UID 42 BODY[HEADER.FIELDS (FROM TO SUBJECT DATE)] {{{}}}\r\n{header} BODY[1] {{{}}}\r\n{body})\r\n",
            header.len(),
            body.len(),
        );
        let script = format!(
            "* OK ready\r\nA1 OK LOGIN completed\r\n* 1 EXISTS\r\nA2 OK EXAMINE completed\r\n{group}A3 OK FETCH completed\r\n* BYE\r\nA4 OK LOGOUT completed\r\n"
        );
        let records = run_session(ScriptedStream::new(script), &descriptor(), &FixedScoring).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].from, "a@x.com");
        assert_eq!(records[0].preview, "Hello");
    }

    #[test]
    fn quoted_string_sections_are_accepted() {
        let script = "* OK ready\r\nA1 OK LOGIN completed\r\n\
                      * 1 EXISTS\r\nA2 OK EXAMINE completed\r\n\
                      * 1 FETCH (BODY[HEADER.FIELDS (FROM TO SUBJECT DATE)] \"From: q@x.com\" BODY[1] \"short\")\r\n\
                      A3 OK FETCH completed\r\n* BYE\r\nA4 OK LOGOUT completed\r\n";
        let records = run_session(ScriptedStream::new(script), &descriptor(), &FixedScoring).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].from, "q@x.com");
        assert_eq!(records[0].preview, "short");
    }

    #[test]
    fn session_state_reaches_done() {
        let script = "* OK ready\r\nA1 OK LOGIN completed\r\n\
                      * 0 EXISTS\r\nA2 OK EXAMINE completed\r\n\
                      * BYE\r\nA3 OK LOGOUT completed\r\n";
        let mut session = ImapSession::new(ScriptedStream::new(script));
        session.login("u", &secrecy::SecretString::from("p")).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
        let total = session.examine_inbox().unwrap();
        assert_eq!(total, 0);
        assert_eq!(session.state(), SessionState::InboxOpen);
        session.logout();
        assert_eq!(session.state(), SessionState::Done);
    }

    #[test]
    fn failed_state_is_sticky_through_logout() {
        let script = "* OK ready\r\nA1 NO go away\r\n";
        let mut session = ImapSession::new(ScriptedStream::new(script));
        assert!(session.login("u", &secrecy::SecretString::from("p")).is_err());
        assert_eq!(session.state(), SessionState::Failed);
        session.logout();
        assert_eq!(session.state(), SessionState::Failed);
    }

    // ── helpers ─────────────────────────────────────────────────────

    #[test]
    fn quoted_escapes_specials() {
        assert_eq!(quoted(r#"pa"ss\word"#), r#""pa\"ss\\word""#);
    }

    #[test]
    fn untagged_fetch_lines_parse() {
        let (seqno, rest) = parse_untagged_fetch("* 12 FETCH (BODY[1] {5}").unwrap();
        assert_eq!(seqno, 12);
        assert_eq!(rest, "BODY[1] {5}");
        assert!(parse_untagged_fetch("* 2 EXPUNGE").is_none());
        assert!(parse_untagged_fetch("A1 OK done").is_none());
    }

    #[test]
    fn literal_lengths_parse_only_at_line_end() {
        assert_eq!(literal_len("{42}"), Some(42));
        assert_eq!(literal_len("{42} trailing"), None);
        assert_eq!(literal_len("\"quoted\""), None);
    }
}
