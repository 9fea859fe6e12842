//! FITS header cards and the ordered keyword record built from them.

use std::str;

use crate::error::FitsError;
use crate::fits::value::{format_value, parse_value, Value};
use crate::fits::{BLOCK_SIZE, CARDS_PER_BLOCK, CARD_SIZE};

// ── Types ──

/// One 80-byte header record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// Keyword, trimmed of its blank padding.
    pub keyword: String,
    /// The parsed value, if the card has a value indicator.
    pub value: Option<Value>,
    /// Comment, or the free text of a commentary card.
    pub comment: Option<String>,
}

impl Card {
    pub fn new(keyword: &str, value: Value) -> Self {
        Card {
            keyword: keyword.to_string(),
            value: Some(value),
            comment: None,
        }
    }

    /// A HISTORY card carrying `text`.
    pub fn history(text: &str) -> Self {
        Card {
            keyword: String::from("HISTORY"),
            value: None,
            comment: Some(text.to_string()),
        }
    }

    pub fn is_end(&self) -> bool {
        self.keyword == "END"
    }

    /// Returns `true` for COMMENT, HISTORY and blank-keyword cards.
    pub fn is_commentary(&self) -> bool {
        is_commentary_keyword(&self.keyword)
    }
}

fn is_commentary_keyword(keyword: &str) -> bool {
    matches!(keyword, "COMMENT" | "HISTORY" | "")
}

/// An ordered header: keyword lookups return the first matching card, and
/// commentary cards keep their order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Header::default()
    }

    pub fn from_cards(cards: Vec<Card>) -> Self {
        Header {
            cards: cards.into_iter().filter(|c| !c.is_end()).collect(),
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn get(&self, keyword: &str) -> Option<&Value> {
        self.cards
            .iter()
            .find(|c| c.keyword == keyword && !c.is_commentary())
            .and_then(|c| c.value.as_ref())
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// Numeric value of `keyword`, promoting integers.
    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(Value::as_f64)
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(Value::as_i64)
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(Value::as_str)
    }

    /// Set `keyword`, replacing the first existing card or appending.
    pub fn set(&mut self, keyword: &str, value: Value) {
        match self
            .cards
            .iter_mut()
            .find(|c| c.keyword == keyword && !c.is_commentary())
        {
            Some(card) => card.value = Some(value),
            None => self.cards.push(Card::new(keyword, value)),
        }
    }

    /// Builder form of [`Header::set`].
    pub fn with(mut self, keyword: &str, value: Value) -> Self {
        self.set(keyword, value);
        self
    }

    pub fn push_history(&mut self, text: &str) {
        self.cards.push(Card::history(text));
    }

    /// Free text of every HISTORY card, in header order.
    pub fn history(&self) -> impl Iterator<Item = &str> {
        self.cards
            .iter()
            .filter(|c| c.keyword == "HISTORY")
            .map(|c| c.comment.as_deref().unwrap_or(""))
    }
}

// ── Parsing ──

/// Parse a single 80-byte card.
pub fn parse_card(bytes: &[u8; CARD_SIZE]) -> Result<Card, FitsError> {
    let raw_keyword = &bytes[..8];
    if !raw_keyword
        .iter()
        .all(|&b| matches!(b, b'A'..=b'Z' | b'0'..=b'9' | b' ' | b'-' | b'_'))
    {
        return Err(FitsError::InvalidKeyword);
    }
    let keyword = str::from_utf8(raw_keyword)
        .map_err(|_| FitsError::InvalidKeyword)?
        .trim_end()
        .to_string();

    let text = |range: std::ops::Range<usize>| -> Result<Option<String>, FitsError> {
        let s = str::from_utf8(&bytes[range])
            .map_err(|_| FitsError::InvalidHeader("non-ASCII card text"))?
            .trim_end();
        Ok((!s.is_empty()).then(|| s.to_string()))
    };

    if keyword == "END" {
        return Ok(Card {
            keyword,
            value: None,
            comment: None,
        });
    }

    if is_commentary_keyword(&keyword) || &bytes[8..10] != b"= " {
        let comment = text(8..CARD_SIZE)?;
        return Ok(Card {
            keyword,
            value: None,
            comment,
        });
    }

    let field = str::from_utf8(&bytes[10..])
        .map_err(|_| FitsError::InvalidHeader("non-ASCII value field"))?;
    let (value, comment) = match parse_value(field) {
        Some((v, c)) => (Some(v), c.map(String::from)),
        None => (None, field.split_once('/').and_then(|(_, c)| {
            let c = c.trim();
            (!c.is_empty()).then(|| c.to_string())
        })),
    };
    Ok(Card {
        keyword,
        value,
        comment,
    })
}

/// Parse header blocks up to and including the END card.
///
/// Returns the header and the number of bytes it occupies (a multiple of
/// [`BLOCK_SIZE`]).
pub fn parse_header(data: &[u8]) -> Result<(Header, usize), FitsError> {
    let mut cards = Vec::new();
    for (block_idx, block) in data.chunks_exact(BLOCK_SIZE).enumerate() {
        for raw in block.chunks_exact(CARD_SIZE) {
            let raw: &[u8; CARD_SIZE] = raw
                .try_into()
                .map_err(|_| FitsError::InvalidHeader("short card"))?;
            let card = parse_card(raw)?;
            if card.is_end() {
                return Ok((Header::from_cards(cards), (block_idx + 1) * BLOCK_SIZE));
            }
            cards.push(card);
        }
    }
    Err(FitsError::UnexpectedEof)
}

// ── Writing ──

/// Serialize one card to its 80-byte image.
pub fn format_card(card: &Card) -> [u8; CARD_SIZE] {
    let mut buf = [b' '; CARD_SIZE];
    let kw = card.keyword.as_bytes();
    let kw_len = kw.len().min(8);
    buf[..kw_len].copy_from_slice(&kw[..kw_len]);

    let mut body = String::new();
    match &card.value {
        Some(value) => {
            body.push_str("= ");
            body.push_str(&format_value(value));
            if let Some(comment) = &card.comment {
                body.push_str(" / ");
                body.push_str(comment);
            }
        }
        None => {
            if let Some(comment) = &card.comment {
                body.push_str(comment);
            }
        }
    }
    let body = body.as_bytes();
    let len = body.len().min(CARD_SIZE - 8);
    buf[8..8 + len].copy_from_slice(&body[..len]);
    buf
}

/// Serialize a header, append END, and pad to whole blocks with blanks.
pub fn serialize_header(header: &Header) -> Vec<u8> {
    let total_cards = header.cards.len() + 1;
    let mut buf = vec![b' '; total_cards.div_ceil(CARDS_PER_BLOCK) * BLOCK_SIZE];
    for (i, card) in header.cards.iter().enumerate() {
        buf[i * CARD_SIZE..(i + 1) * CARD_SIZE].copy_from_slice(&format_card(card));
    }
    let end = header.cards.len() * CARD_SIZE;
    buf[end..end + 3].copy_from_slice(b"END");
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_card(s: &str) -> [u8; CARD_SIZE] {
        let mut buf = [b' '; CARD_SIZE];
        let bytes = s.as_bytes();
        let len = bytes.len().min(CARD_SIZE);
        buf[..len].copy_from_slice(&bytes[..len]);
        buf
    }

    fn make_block(cards: &[&str]) -> Vec<u8> {
        let mut block = vec![b' '; BLOCK_SIZE];
        for (i, c) in cards.iter().enumerate() {
            block[i * CARD_SIZE..(i + 1) * CARD_SIZE].copy_from_slice(&make_card(c));
        }
        block
    }

    #[test]
    fn parse_card_string_value() {
        let c = parse_card(&make_card("BUNIT   = 'JY/BEAM '           / Units of flux")).unwrap();
        assert_eq!(c.keyword, "BUNIT");
        assert_eq!(c.value, Some(Value::String(String::from("JY/BEAM"))));
        assert_eq!(c.comment.as_deref(), Some("Units of flux"));
    }

    #[test]
    fn parse_card_history() {
        let c = parse_card(&make_card(
            "HISTORY AIPS   CLEAN BMAJ=  1.3889E-03 BMIN=  1.3889E-03 BPA=   0.00",
        ))
        .unwrap();
        assert_eq!(c.keyword, "HISTORY");
        assert!(c.value.is_none());
        assert!(c.is_commentary());
        assert!(c.comment.unwrap().contains("CLEAN BMAJ"));
    }

    #[test]
    fn parse_card_rejects_lowercase_keyword() {
        assert!(matches!(
            parse_card(&make_card("bitpix  =                    16")),
            Err(FitsError::InvalidKeyword)
        ));
    }

    #[test]
    fn parse_card_undefined_value_keeps_comment() {
        let c = parse_card(&make_card("BLANK   =                      / undefined value")).unwrap();
        assert!(c.value.is_none());
        assert_eq!(c.comment.as_deref(), Some("undefined value"));
    }

    #[test]
    fn parse_header_stops_at_end() {
        let block = make_block(&[
            "SIMPLE  =                    T",
            "BITPIX  =                  -32",
            "NAXIS   =                    2",
            "END",
            "IGNORED =                    1",
        ]);
        let (header, len) = parse_header(&block).unwrap();
        assert_eq!(len, BLOCK_SIZE);
        assert_eq!(header.cards().len(), 3);
        assert_eq!(header.get_i64("BITPIX"), Some(-32));
        assert!(!header.contains("IGNORED"));
    }

    #[test]
    fn parse_header_without_end() {
        let block = make_block(&["SIMPLE  =                    T"]);
        assert!(matches!(parse_header(&block), Err(FitsError::UnexpectedEof)));
        assert!(matches!(parse_header(&[]), Err(FitsError::UnexpectedEof)));
    }

    #[test]
    fn header_set_replaces_first_card() {
        let mut h = Header::new()
            .with("NAXIS", Value::Integer(4))
            .with("BMAJ", Value::Float(0.01));
        h.set("NAXIS", Value::Integer(2));
        assert_eq!(h.get_i64("NAXIS"), Some(2));
        assert_eq!(h.cards().len(), 2);
    }

    #[test]
    fn history_lines_in_order() {
        let mut h = Header::new();
        h.push_history("first");
        h.set("BUNIT", Value::String(String::from("JY/BEAM")));
        h.push_history("second");
        let lines: Vec<&str> = h.history().collect();
        assert_eq!(lines, vec!["first", "second"]);
    }

    #[test]
    fn history_is_not_a_keyword_value() {
        let mut h = Header::new();
        h.push_history("HISTORY text");
        assert!(h.get("HISTORY").is_none());
    }

    #[test]
    fn serialized_header_parses_back() {
        let mut h = Header::new()
            .with("SIMPLE", Value::Logical(true))
            .with("BITPIX", Value::Integer(-64))
            .with("CTYPE1", Value::String(String::from("RA---SIN")))
            .with("CDELT1", Value::Float(-2.5e-4));
        h.push_history("AIPS CLEAN BMAJ= 1.0E-03 BMIN= 5.0E-04");
        let bytes = serialize_header(&h);
        assert_eq!(bytes.len() % BLOCK_SIZE, 0);
        let (parsed, len) = parse_header(&bytes).unwrap();
        assert_eq!(len, bytes.len());
        assert_eq!(parsed, h);
    }

    #[test]
    fn serialize_spills_into_second_block() {
        let mut h = Header::new();
        for i in 0..CARDS_PER_BLOCK {
            h.set(&format!("KEY{i}"), Value::Integer(i as i64));
        }
        let bytes = serialize_header(&h);
        assert_eq!(bytes.len(), 2 * BLOCK_SIZE);
        let (parsed, _) = parse_header(&bytes).unwrap();
        assert_eq!(parsed.cards().len(), CARDS_PER_BLOCK);
    }
}
