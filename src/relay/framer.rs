//! Streaming classification of terminal byte streams.
//!
//! The framer splits buffered bytes into plain-text runs and escape/control
//! sequences so the transcript can show them as separate records. It never
//! interprets a sequence for its terminal effect and never touches the bytes
//! being forwarded.

use std::fmt;

const ESC: u8 = 0x1b;
const BEL: u8 = 0x07;

/// Classification of a framed byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    PlainText,
    /// `ESC`, optional intermediates, one final byte (e.g. `ESC 7`, `ESC ( B`).
    Escape,
    /// Control Sequence Introducer, `ESC [`.
    Csi,
    /// Operating System Command, `ESC ]`.
    Osc,
    /// Application Program Command, `ESC _`.
    Apc,
    /// Malformed, aborted or force-closed sequence.
    UnknownEscape,
}

impl TokenKind {
    /// Short lowercase label used in transcript headers.
    pub fn label(self) -> &'static str {
        match self {
            TokenKind::PlainText => "plain",
            TokenKind::Escape => "escape",
            TokenKind::Csi => "csi",
            TokenKind::Osc => "osc",
            TokenKind::Apc => "apc",
            TokenKind::UnknownEscape => "unknown",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified span of buffered bytes. `raw` borrows the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub raw: &'a [u8],
    /// `false` only for tokens force-closed without seeing their end.
    pub complete: bool,
}

impl<'a> Token<'a> {
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }
}

/// Outcome of scanning the front of a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan<'a> {
    /// Nothing to classify.
    Empty,
    /// A token whose end is known.
    Complete(Token<'a>),
    /// The slice ends before the token does. A plain-text run is reported
    /// here too, since the next read may extend it.
    Incomplete(TokenKind),
}

/// Stateless classifier; all carry-over state lives in the
/// [`StreamBuffer`](super::StreamBuffer) cursor.
#[derive(Debug, Default, Clone, Copy)]
pub struct SequenceFramer;

impl SequenceFramer {
    pub fn new() -> Self {
        Self
    }

    /// Classify the token at the start of `pending`.
    pub fn scan<'a>(&self, pending: &'a [u8]) -> Scan<'a> {
        let Some(&first) = pending.first() else {
            return Scan::Empty;
        };

        if first != ESC {
            return match pending.iter().position(|&b| b == ESC) {
                Some(end) => Scan::Complete(complete(TokenKind::PlainText, &pending[..end])),
                None => Scan::Incomplete(TokenKind::PlainText),
            };
        }

        match pending.get(1) {
            None => Scan::Incomplete(TokenKind::UnknownEscape),
            Some(b'[') => scan_csi(pending),
            Some(b']') => scan_string(pending, TokenKind::Osc, true),
            Some(b'_') => scan_string(pending, TokenKind::Apc, false),
            Some(_) => scan_escape(pending),
        }
    }

    /// Classify as many complete tokens as `pending` holds.
    ///
    /// Returns the tokens in order and whatever trails them: `None` if the
    /// tokens cover all of `pending`, otherwise the kind of the unfinished
    /// token starting right after the last one.
    pub fn frame<'a>(&self, pending: &'a [u8]) -> (Vec<Token<'a>>, Option<TokenKind>) {
        let mut tokens = Vec::new();
        let mut offset = 0;
        loop {
            match self.scan(&pending[offset..]) {
                Scan::Empty => return (tokens, None),
                Scan::Complete(token) => {
                    offset += token.len();
                    tokens.push(token);
                }
                Scan::Incomplete(kind) => return (tokens, Some(kind)),
            }
        }
    }

    /// Close everything in `pending` as one diagnostic token. Used when a
    /// single sequence fills the whole buffer without terminating.
    pub fn force_close<'a>(&self, pending: &'a [u8]) -> Token<'a> {
        Token {
            kind: TokenKind::UnknownEscape,
            raw: pending,
            complete: false,
        }
    }
}

fn complete(kind: TokenKind, raw: &[u8]) -> Token<'_> {
    Token {
        kind,
        raw,
        complete: true,
    }
}

fn scan_csi(pending: &[u8]) -> Scan<'_> {
    for (i, &b) in pending.iter().enumerate().skip(2) {
        match b {
            0x30..=0x3f | 0x20..=0x2f => continue,
            0x40..=0x7e => return Scan::Complete(complete(TokenKind::Csi, &pending[..=i])),
            // Anything else (C0 control, DEL, a new ESC) aborts the sequence.
            _ => return Scan::Complete(complete(TokenKind::UnknownEscape, &pending[..i])),
        }
    }
    Scan::Incomplete(TokenKind::Csi)
}

fn scan_string(pending: &[u8], kind: TokenKind, bel_terminates: bool) -> Scan<'_> {
    let mut i = 2;
    while i < pending.len() {
        match pending[i] {
            BEL if bel_terminates => return Scan::Complete(complete(kind, &pending[..=i])),
            ESC => match pending.get(i + 1) {
                Some(b'\\') => return Scan::Complete(complete(kind, &pending[..i + 2])),
                Some(_) => i += 1,
                None => break,
            },
            _ => i += 1,
        }
    }
    Scan::Incomplete(kind)
}

fn scan_escape(pending: &[u8]) -> Scan<'_> {
    for (i, &b) in pending.iter().enumerate().skip(1) {
        match b {
            0x20..=0x2f => continue,
            0x30..=0x7e => return Scan::Complete(complete(TokenKind::Escape, &pending[..=i])),
            // A control byte ends the sequence without being part of it; it
            // is framed on its own next.
            _ => return Scan::Complete(complete(TokenKind::UnknownEscape, &pending[..i])),
        }
    }
    Scan::Incomplete(TokenKind::Escape)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tokens: &[Token<'_>]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(SequenceFramer.scan(b""), Scan::Empty);
        let (tokens, tail) = SequenceFramer.frame(b"");
        assert!(tokens.is_empty());
        assert_eq!(tail, None);
    }

    #[test]
    fn test_plain_text_without_escape_is_open_ended() {
        assert_eq!(
            SequenceFramer.scan(b"ls\n"),
            Scan::Incomplete(TokenKind::PlainText)
        );
    }

    #[test]
    fn test_plain_text_before_escape() {
        let (tokens, tail) = SequenceFramer.frame(b"ab\x1b[2J");
        assert_eq!(kinds(&tokens), vec![TokenKind::PlainText, TokenKind::Csi]);
        assert_eq!(tokens[0].raw, b"ab");
        assert_eq!(tokens[1].raw, b"\x1b[2J");
        assert_eq!(tail, None);
    }

    #[test]
    fn test_csi_with_parameters() {
        let (tokens, _) = SequenceFramer.frame(b"\x1b[38;5;196m");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Csi);
        assert_eq!(tokens[0].len(), 11);
    }

    #[test]
    fn test_private_mode_csi() {
        let (tokens, tail) = SequenceFramer.frame(b"\x1b[?1049h");
        assert_eq!(kinds(&tokens), vec![TokenKind::Csi]);
        assert_eq!(tail, None);
    }

    #[test]
    fn test_incomplete_csi() {
        assert_eq!(
            SequenceFramer.scan(b"\x1b[2"),
            Scan::Incomplete(TokenKind::Csi)
        );
        assert_eq!(
            SequenceFramer.scan(b"\x1b["),
            Scan::Incomplete(TokenKind::Csi)
        );
    }

    #[test]
    fn test_lone_escape_is_incomplete() {
        assert_eq!(
            SequenceFramer.scan(b"\x1b"),
            Scan::Incomplete(TokenKind::UnknownEscape)
        );
    }

    #[test]
    fn test_csi_aborted_by_control_byte() {
        let (tokens, tail) = SequenceFramer.frame(b"\x1b[12\rx");
        assert_eq!(tokens[0].kind, TokenKind::UnknownEscape);
        assert_eq!(tokens[0].raw, b"\x1b[12");
        assert_eq!(tail, Some(TokenKind::PlainText));
    }

    #[test]
    fn test_osc_terminated_by_bel() {
        let (tokens, tail) = SequenceFramer.frame(b"\x1b]0;title\x07$ ");
        assert_eq!(tokens[0].kind, TokenKind::Osc);
        assert_eq!(tokens[0].raw, b"\x1b]0;title\x07");
        assert_eq!(tail, Some(TokenKind::PlainText));
    }

    #[test]
    fn test_osc_terminated_by_st() {
        let (tokens, tail) = SequenceFramer.frame(b"\x1b]8;;http://x\x1b\\");
        assert_eq!(kinds(&tokens), vec![TokenKind::Osc]);
        assert_eq!(tokens[0].len(), 15);
        assert_eq!(tail, None);
    }

    #[test]
    fn test_osc_waiting_on_st_second_byte() {
        assert_eq!(
            SequenceFramer.scan(b"\x1b]0;t\x1b"),
            Scan::Incomplete(TokenKind::Osc)
        );
    }

    #[test]
    fn test_apc_ignores_bel() {
        assert_eq!(
            SequenceFramer.scan(b"\x1b_Gf=100\x07"),
            Scan::Incomplete(TokenKind::Apc)
        );
        let (tokens, _) = SequenceFramer.frame(b"\x1b_Gf=100\x07\x1b\\");
        assert_eq!(kinds(&tokens), vec![TokenKind::Apc]);
    }

    #[test]
    fn test_simple_escape() {
        let (tokens, _) = SequenceFramer.frame(b"\x1b7\x1b(B\x1b=");
        assert_eq!(
            kinds(&tokens),
            vec![TokenKind::Escape, TokenKind::Escape, TokenKind::Escape]
        );
        assert_eq!(tokens[1].raw, b"\x1b(B");
    }

    #[test]
    fn test_escape_followed_by_escape() {
        let (tokens, tail) = SequenceFramer.frame(b"\x1b\x1b[A");
        assert_eq!(kinds(&tokens), vec![TokenKind::UnknownEscape, TokenKind::Csi]);
        assert_eq!(tokens[0].raw, b"\x1b");
        assert_eq!(tail, None);
    }

    #[test]
    fn test_escape_with_intermediate_then_control() {
        let (tokens, _) = SequenceFramer.frame(b"\x1b(\n");
        assert_eq!(tokens[0].kind, TokenKind::UnknownEscape);
        assert_eq!(tokens[0].raw, b"\x1b(");
    }

    #[test]
    fn test_force_close_covers_everything() {
        let input = b"\x1b]very long title";
        let token = SequenceFramer.force_close(input);
        assert_eq!(token.kind, TokenKind::UnknownEscape);
        assert!(!token.complete);
        assert_eq!(token.raw, input);
    }

    #[test]
    fn test_every_prefix_of_a_sequence_is_withheld() {
        let whole = b"\x1b]2;build\x1b\\";
        for split in 1..whole.len() {
            let (tokens, tail) = SequenceFramer.frame(&whole[..split]);
            assert!(tokens.is_empty(), "split at {split}");
            assert!(tail.is_some(), "split at {split}");
        }
        let (tokens, tail) = SequenceFramer.frame(whole);
        assert_eq!(kinds(&tokens), vec![TokenKind::Osc]);
        assert_eq!(tail, None);
    }

    #[test]
    fn test_token_kind_labels() {
        assert_eq!(TokenKind::Csi.to_string(), "csi");
        assert_eq!(TokenKind::UnknownEscape.label(), "unknown");
    }
}
