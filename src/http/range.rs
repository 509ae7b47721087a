//! HTTP Range request parsing module
//!
//! Single `bytes` range parsing per RFC 9110 section 14.

/// Inclusive byte range within a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }
}

/// Range header parse result
#[derive(Debug, PartialEq, Eq)]
pub enum RangeParseResult {
    /// Satisfiable range, already clamped to the file size
    Valid(ByteRange),
    /// Answer 416
    NotSatisfiable,
    /// No Range header or malformed (ignore, return full content)
    None,
}

/// Parse HTTP Range header (single range only, bytes unit)
///
/// Supported formats:
/// - `bytes=start-end`
/// - `bytes=start-`
/// - `bytes=-suffix`
pub fn parse_range_header(range_header: Option<&str>, file_size: usize) -> RangeParseResult {
    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeParseResult::None;
    };

    // Multi-range responses are not produced
    if spec.contains(',') {
        return RangeParseResult::None;
    }

    let Some((start_str, end_str)) = spec.split_once('-') else {
        return RangeParseResult::None;
    };
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    if start_str.is_empty() {
        let Ok(suffix) = end_str.parse::<usize>() else {
            return RangeParseResult::None;
        };
        if suffix == 0 || file_size == 0 {
            return RangeParseResult::NotSatisfiable;
        }
        return RangeParseResult::Valid(ByteRange {
            start: file_size.saturating_sub(suffix),
            end: file_size - 1,
        });
    }

    let Ok(start) = start_str.parse::<usize>() else {
        return RangeParseResult::None;
    };
    if start >= file_size {
        return RangeParseResult::NotSatisfiable;
    }

    let end = if end_str.is_empty() {
        file_size - 1
    } else {
        let Ok(end) = end_str.parse::<usize>() else {
            return RangeParseResult::None;
        };
        if end < start {
            // Invalid range-spec, ignored like any other malformed header
            return RangeParseResult::None;
        }
        end.min(file_size - 1)
    };

    RangeParseResult::Valid(ByteRange { start, end })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid(start: usize, end: usize) -> RangeParseResult {
        RangeParseResult::Valid(ByteRange { start, end })
    }

    #[test]
    fn test_no_range() {
        assert_eq!(parse_range_header(None, 100), RangeParseResult::None);
        assert_eq!(parse_range_header(Some("items=0-9"), 100), RangeParseResult::None);
    }

    #[test]
    fn test_standard_range() {
        assert_eq!(parse_range_header(Some("bytes=0-9"), 100), valid(0, 9));
        assert_eq!(parse_range_header(Some("bytes=90-500"), 100), valid(90, 99));
    }

    #[test]
    fn test_open_range() {
        let result = parse_range_header(Some("bytes=50-"), 100);
        assert_eq!(result, valid(50, 99));
        if let RangeParseResult::Valid(range) = result {
            assert_eq!(range.len(), 50);
        }
    }

    #[test]
    fn test_suffix_range() {
        assert_eq!(parse_range_header(Some("bytes=-20"), 100), valid(80, 99));
        assert_eq!(parse_range_header(Some("bytes=-500"), 100), valid(0, 99));
    }

    #[test]
    fn test_not_satisfiable() {
        assert_eq!(
            parse_range_header(Some("bytes=200-"), 100),
            RangeParseResult::NotSatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=-0"), 100),
            RangeParseResult::NotSatisfiable
        );
        assert_eq!(
            parse_range_header(Some("bytes=-5"), 0),
            RangeParseResult::NotSatisfiable
        );
    }

    #[test]
    fn test_invalid_format() {
        assert_eq!(parse_range_header(Some("bytes=a-b"), 100), RangeParseResult::None);
        assert_eq!(
            parse_range_header(Some("bytes=0-9,20-29"), 100),
            RangeParseResult::None
        );
        assert_eq!(parse_range_header(Some("bytes=9-3"), 100), RangeParseResult::None);
    }
}
