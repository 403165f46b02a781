//! Per-message reassembly of the fetch response's header and body streams.
//!
//! A fetch delivers two independent byte streams per message — the header
//! fields section and the first body part — in arbitrarily sized chunks,
//! in either order. The assembler keeps one isolated buffer state per
//! sequence number and only builds the record on the explicit message-end
//! signal, never by inferring completion from buffer contents.

use std::collections::HashMap;

use crate::imap::header;
use crate::imap::preview;
use crate::record::EmailRecord;
use crate::score::ScoringStrategy;

/// Subject used when the header block carries none.
pub const NO_SUBJECT: &str = "(No Subject)";

/// Buffer state for one in-flight message.
#[derive(Debug, Default)]
struct PendingMessage {
    header_buf: Vec<u8>,
    body_buf: Vec<u8>,
    header_done: bool,
    body_done: bool,
}

/// Correlates header/body stream events per sequence number.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    pending: HashMap<u32, PendingMessage>,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header_chunk(&mut self, seqno: u32, chunk: &[u8]) {
        self.pending
            .entry(seqno)
            .or_default()
            .header_buf
            .extend_from_slice(chunk);
    }

    pub fn body_chunk(&mut self, seqno: u32, chunk: &[u8]) {
        self.pending
            .entry(seqno)
            .or_default()
            .body_buf
            .extend_from_slice(chunk);
    }

    pub fn header_end(&mut self, seqno: u32) {
        self.pending.entry(seqno).or_default().header_done = true;
    }

    pub fn body_end(&mut self, seqno: u32) {
        self.pending.entry(seqno).or_default().body_done = true;
    }

    /// Message-end signal: consume the buffered state and build the record.
    ///
    /// The protocol layer guarantees both streams have ended by the time
    /// this fires; if one has not, whatever was buffered is still used —
    /// a partial record beats a dropped one.
    pub fn message_end(&mut self, seqno: u32, scoring: &dyn ScoringStrategy) -> EmailRecord {
        let state = self.pending.remove(&seqno).unwrap_or_default();
        if !(state.header_done && state.body_done) {
            tracing::debug!(seqno, "message ended before both streams finished");
        }

        let fields = header::parse_headers(&String::from_utf8_lossy(&state.header_buf));
        let from = header::first_value(&fields, "from").unwrap_or("").to_string();
        let subject = header::first_value(&fields, "subject")
            .unwrap_or(NO_SUBJECT)
            .to_string();
        let date = header::first_value(&fields, "date").unwrap_or("").to_string();
        let preview = preview::extract_preview(&String::from_utf8_lossy(&state.body_buf));

        let score = scoring.score(&from, &subject, &preview);
        EmailRecord {
            id: EmailRecord::sequence_id(seqno),
            from,
            subject,
            date,
            preview,
            importance: score.importance,
            read_status: score.read_status,
            categories: score.categories,
        }
    }

    /// Sequence numbers whose message-end never fired, ascending.
    pub fn unfinished(&self) -> Vec<u32> {
        let mut seqnos: Vec<u32> = self.pending.keys().copied().collect();
        seqnos.sort_unstable();
        seqnos
    }
}
