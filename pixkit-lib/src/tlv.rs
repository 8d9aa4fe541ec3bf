//! Tag-Length-Value field scanner for EMV Merchant Presented Mode text.
//!
//! Every field is `TTLLV...V`: a two-digit tag, a two-digit decimal length,
//! then exactly that many characters of value. Nested regions (merchant
//! account information, additional data) are plain TLV again, so the same
//! scanner is re-applied to the value substring - there is no recursion and
//! no special-casing.

use crate::errors::PixError;

/// A single scanned field, borrowing from the scanned text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TlvField<'a> {
    /// Two-digit tag, e.g. `"26"`.
    pub tag: &'a str,
    /// The value substring, exactly as long as the declared length.
    pub value: &'a str,
    /// Offset of the field's first tag character within the scanned text.
    pub offset: usize,
}

/// Scan failure, pointing at the offending offset.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TlvError {
    /// Fewer than four characters remain at `offset`, so there is no room
    /// for a tag and a length.
    #[error("truncated TLV header at offset {offset}")]
    TruncatedHeader {
        /// Offset of the incomplete header.
        offset: usize,
    },

    /// The two tag characters at `offset` are not ASCII digits.
    #[error("TLV tag at offset {offset} is not two ASCII digits")]
    InvalidTag {
        /// Offset of the malformed tag.
        offset: usize,
    },

    /// The two length characters are not ASCII digits.
    #[error("TLV length at offset {offset} is not two ASCII digits")]
    InvalidLength {
        /// Offset of the field whose length is malformed.
        offset: usize,
    },

    /// The declared length runs past the end of the text.
    #[error("TLV value truncated at offset {offset}: declared {declared}, available {available}")]
    TruncatedValue {
        /// Offset of the field whose value is truncated.
        offset: usize,
        /// Declared value length.
        declared: usize,
        /// Characters actually remaining.
        available: usize,
    },
}

impl TlvError {
    /// Offset of the field that failed to scan.
    pub fn offset(&self) -> usize {
        match self {
            Self::TruncatedHeader { offset }
            | Self::InvalidTag { offset }
            | Self::InvalidLength { offset }
            | Self::TruncatedValue { offset, .. } => *offset,
        }
    }
}

impl From<TlvError> for PixError {
    fn from(err: TlvError) -> Self {
        PixError::MalformedTlv {
            offset: err.offset(),
            detail: err.to_string(),
        }
    }
}

/// Scans one field at `offset`, returning the field and the offset of the
/// next one.
///
/// Pure function of `(text, offset)`; scanning a nested region is just a
/// call with the region substring.
pub fn scan(text: &str, offset: usize) -> Result<(TlvField<'_>, usize), TlvError> {
    let remaining = text.len().saturating_sub(offset);
    if remaining < 4 {
        return Err(TlvError::TruncatedHeader { offset });
    }

    // `get` keeps the scanner total on arbitrary (non-ASCII) input instead
    // of panicking on a char boundary.
    let tag = text
        .get(offset..offset + 2)
        .ok_or(TlvError::InvalidTag { offset })?;
    if !tag.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TlvError::InvalidTag { offset });
    }

    let length_digits = text
        .get(offset + 2..offset + 4)
        .ok_or(TlvError::InvalidLength { offset })?;
    if !length_digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TlvError::InvalidLength { offset });
    }
    // Two ASCII digits always parse.
    let declared: usize = length_digits.parse().unwrap_or(0);

    let value_start = offset + 4;
    let available = text.len() - value_start;
    if available < declared {
        return Err(TlvError::TruncatedValue {
            offset,
            declared,
            available,
        });
    }

    let value = text
        .get(value_start..value_start + declared)
        .ok_or(TlvError::TruncatedValue {
            offset,
            declared,
            available,
        })?;
    Ok((
        TlvField { tag, value, offset },
        value_start + declared,
    ))
}

/// Iterator walking every field of `text` from left to right.
///
/// Yields `Err` once at the first malformed field, then stops.
#[derive(Clone, Debug)]
pub struct TlvScanner<'a> {
    text: &'a str,
    offset: usize,
    failed: bool,
}

impl<'a> TlvScanner<'a> {
    /// Creates a scanner over the whole of `text`.
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            offset: 0,
            failed: false,
        }
    }
}

impl<'a> Iterator for TlvScanner<'a> {
    type Item = Result<TlvField<'a>, TlvError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.text.len() {
            return None;
        }
        match scan(self.text, self.offset) {
            Ok((field, next)) => {
                self.offset = next;
                Some(Ok(field))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Scans the whole text into a field list, failing on the first malformed
/// field.
pub fn scan_all(text: &str) -> Result<Vec<TlvField<'_>>, TlvError> {
    TlvScanner::new(text).collect()
}

/// Returns the first field with the given tag, if the text scans cleanly
/// that far.
pub fn find_tag<'a>(text: &'a str, tag: &str) -> Result<Option<TlvField<'a>>, TlvError> {
    for field in TlvScanner::new(text) {
        let field = field?;
        if field.tag == tag {
            return Ok(Some(field));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_scan_single_field() {
        let (field, next) = scan("000201", 0).unwrap();
        assert_eq!(field.tag, "00");
        assert_eq!(field.value, "01");
        assert_eq!(field.offset, 0);
        assert_eq!(next, 6);
    }

    #[test]
    fn test_scan_sequence() {
        let text = "0002015204000053039865802BR";
        let fields = scan_all(text).unwrap();
        let tags: Vec<_> = fields.iter().map(|f| f.tag).collect();
        assert_eq!(tags, vec!["00", "52", "53", "58"]);
        assert_eq!(fields[3].value, "BR");
    }

    #[test]
    fn test_scan_nested_region_with_same_algorithm() {
        let inner = "0014br.gov.bcb.pix0118fulano@example.com";
        let outer = format!("26{:02}{inner}", inner.len());

        let (field, _) = scan(&outer, 0).unwrap();
        assert_eq!(field.tag, "26");

        let sub = scan_all(field.value).unwrap();
        assert_eq!(sub[0].tag, "00");
        assert_eq!(sub[0].value, "br.gov.bcb.pix");
        assert_eq!(sub[1].tag, "01");
        assert_eq!(sub[1].value, "fulano@example.com");
    }

    #[test]
    fn test_truncated_header() {
        assert_eq!(
            scan("000", 0),
            Err(TlvError::TruncatedHeader { offset: 0 })
        );
        assert_eq!(
            scan("000201", 6),
            Err(TlvError::TruncatedHeader { offset: 6 })
        );
    }

    #[test]
    fn test_non_digit_tag_and_length() {
        assert_eq!(scan("ab0201", 0), Err(TlvError::InvalidTag { offset: 0 }));
        assert_eq!(
            scan("00xx01", 0),
            Err(TlvError::InvalidLength { offset: 0 })
        );
    }

    #[test]
    fn test_declared_length_past_end() {
        let err = scan("0009short", 0).unwrap_err();
        assert_eq!(
            err,
            TlvError::TruncatedValue {
                offset: 0,
                declared: 9,
                available: 5,
            }
        );
    }

    #[test]
    fn test_scanner_stops_after_error() {
        let mut scanner = TlvScanner::new("000201xx");
        assert!(scanner.next().unwrap().is_ok());
        assert!(scanner.next().unwrap().is_err());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_find_tag() {
        let text = "0002015204000053039865802BR";
        let field = find_tag(text, "53").unwrap().unwrap();
        assert_eq!(field.value, "986");
        assert!(find_tag(text, "99").unwrap().is_none());
    }

    #[test]
    fn test_conversion_into_pix_error() {
        let err: PixError = TlvError::TruncatedValue {
            offset: 12,
            declared: 9,
            available: 5,
        }
        .into();
        match err {
            PixError::MalformedTlv { offset, .. } => assert_eq!(offset, 12),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    proptest! {
        // Encoding tag + 2-digit length + value and re-scanning yields the
        // exact (tag, value) pair back, for every tag and any value up to
        // the 99-character TLV ceiling.
        #[test]
        fn prop_roundtrip(tag in 0u8..=99, value in "[0-9A-Za-z@./+ -]{0,99}") {
            let tag = format!("{tag:02}");
            let encoded = format!("{tag}{:02}{value}", value.len());
            let (field, next) = scan(&encoded, 0).unwrap();
            prop_assert_eq!(field.tag, tag.as_str());
            prop_assert_eq!(field.value, value.as_str());
            prop_assert_eq!(next, encoded.len());
        }
    }
}
