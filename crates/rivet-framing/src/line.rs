//! Bounded line reads shared by both framings.

use std::io::{self, BufRead};

/// Result of reading one line into the caller's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Line {
    /// The buffer holds the line without its terminator.
    Fits,
    /// The line exceeded the limit; its bytes were consumed and the buffer
    /// is empty.
    TooLong {
        /// Length of the discarded line.
        length: usize,
    },
}

/// Reads up to and including the next `\n`, keeping at most `limit` bytes.
///
/// The terminator and one trailing `\r` are stripped, and neither counts
/// toward `limit`. Returns `None` when the stream is already at its end. A
/// final line without a terminator is still returned.
pub(crate) fn read_line<R: BufRead>(
    reader: &mut R,
    buffer: &mut Vec<u8>,
    limit: usize,
) -> io::Result<Option<Line>> {
    buffer.clear();
    let capacity = limit.saturating_add(1);
    let mut length = 0_usize;
    let mut last_byte = None;
    let mut started = false;
    loop {
        let available = match reader.fill_buf() {
            Ok(available) => available,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        };
        if available.is_empty() {
            break;
        }
        started = true;

        let newline = available.iter().position(|byte| *byte == b'\n');
        let end = newline.unwrap_or(available.len());
        let chunk = available.get(..end).unwrap_or_default();
        length = length.saturating_add(chunk.len());
        if length <= capacity {
            buffer.extend_from_slice(chunk);
        }
        if let Some(byte) = chunk.last() {
            last_byte = Some(*byte);
        }
        let consumed = newline.map_or(end, |position| position.saturating_add(1));
        reader.consume(consumed);
        if newline.is_some() {
            break;
        }
    }

    if !started {
        return Ok(None);
    }
    let carriage_return = last_byte == Some(b'\r');
    let content = if carriage_return {
        length.saturating_sub(1)
    } else {
        length
    };
    if content > limit {
        buffer.clear();
        return Ok(Some(Line::TooLong { length: content }));
    }
    if carriage_return {
        buffer.pop();
    }
    Ok(Some(Line::Fits))
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rstest::rstest;

    use super::*;

    fn lines(input: &str, limit: usize) -> Vec<(Option<Line>, String)> {
        let mut reader = Cursor::new(input.as_bytes().to_vec());
        let mut buffer = Vec::new();
        let mut seen = Vec::new();
        loop {
            let line = read_line(&mut reader, &mut buffer, limit).expect("in-memory read");
            let text = String::from_utf8(buffer.clone()).expect("utf-8 line");
            let finished = line.is_none();
            seen.push((line, text));
            if finished {
                return seen;
            }
        }
    }

    #[test]
    fn splits_on_newlines_and_strips_carriage_returns() {
        let seen = lines("one\r\ntwo\nthree", 64);
        let texts: Vec<&str> = seen.iter().map(|(_, text)| text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three", ""]);
        assert_eq!(seen.last().map(|(line, _)| *line), Some(None));
    }

    #[rstest]
    #[case("\n", "")]
    #[case("\r\n", "")]
    fn blank_lines_are_returned_empty(#[case] input: &str, #[case] expected: &str) {
        let seen = lines(input, 8);
        assert_eq!(seen.first().map(|(_, text)| text.as_str()), Some(expected));
        assert_eq!(seen.first().map(|(line, _)| *line), Some(Some(Line::Fits)));
    }

    #[test]
    fn long_lines_are_consumed_and_reported() {
        let seen = lines("abcdefghij\nok\n", 4);
        assert_eq!(
            seen.first().map(|(line, _)| *line),
            Some(Some(Line::TooLong { length: 10 }))
        );
        assert_eq!(seen.get(1).map(|(_, text)| text.as_str()), Some("ok"));
    }

    #[rstest]
    #[case("abcd\r\n")]
    #[case("abcd\n")]
    #[case("abcd\r")]
    fn terminators_do_not_count_toward_the_limit(#[case] input: &str) {
        let seen = lines(input, 4);
        assert_eq!(seen.first().map(|(line, _)| *line), Some(Some(Line::Fits)));
        assert_eq!(seen.first().map(|(_, text)| text.as_str()), Some("abcd"));
    }

    #[test]
    fn one_byte_over_the_limit_is_too_long_even_with_crlf() {
        let seen = lines("abcde\r\n", 4);
        assert_eq!(
            seen.first().map(|(line, _)| *line),
            Some(Some(Line::TooLong { length: 5 }))
        );
    }

    #[test]
    fn lines_spanning_buffer_refills_are_joined() {
        let input = "x".repeat(100);
        let mut reader = io::BufReader::with_capacity(7, Cursor::new(format!("{input}\n")));
        let mut buffer = Vec::new();
        let line = read_line(&mut reader, &mut buffer, 128).expect("in-memory read");
        assert_eq!(line, Some(Line::Fits));
        assert_eq!(buffer.len(), 100);
    }
}
