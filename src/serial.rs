//! Line assembly and parsing for the serial control protocol.
//!
//! One command per `\n`-terminated line, no whitespace. The first byte
//! selects the command by its offset from ASCII `0` (so `R` is 34 and `D` is
//! 20); the rest of the line is a bounded decimal field. Parsing is
//! deliberately forgiving: oversized lines are truncated, oversized fields
//! are cut to their fixed width, and garbage fields convert to 0. Nothing in
//! here can fail the caller.

use crate::config::{COMMAND_LINE_MAX, DEBOUNCE_FIELD_WIDTH, SENSITIVITY_FIELD_WIDTH};

const REPORT_SELECTOR: i32 = (b'R' - b'0') as i32;
const DEBOUNCE_SELECTOR: i32 = (b'D' - b'0') as i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    SetSensitivity { channel: usize, value: i32 },
    ReportSensitivities,
    SetDebounce { micros: i32 },
    Unrecognized { code: i32 },
}

/// Accumulates raw input bytes into one bounded command line.
#[derive(Default)]
pub struct LineAssembler {
    buf: heapless::Vec<u8, COMMAND_LINE_MAX>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            buf: heapless::Vec::new(),
        }
    }

    /// Feed one byte; returns the finished line on `\n`. Carriage returns
    /// are discarded, bytes past capacity are dropped without error, and
    /// empty lines yield nothing.
    pub fn feed(&mut self, byte: u8) -> Option<heapless::Vec<u8, COMMAND_LINE_MAX>> {
        match byte {
            b'\n' => {
                let line = core::mem::take(&mut self.buf);
                if line.is_empty() {
                    None
                } else {
                    Some(line)
                }
            }
            b'\r' => None,
            _ => {
                if self.buf.push(byte).is_err() {
                    log::trace!("command byte dropped, line buffer full");
                }
                None
            }
        }
    }
}

/// Parse one completed line. `channel_count` bounds the digit selectors.
pub fn parse_command(line: &[u8], channel_count: usize) -> Command {
    let first = line.first().copied().unwrap_or(0);
    let code = first as i32 - b'0' as i32;
    if code >= 0 && (code as usize) < channel_count {
        Command::SetSensitivity {
            channel: code as usize,
            value: parse_decimal_field(&line[1..], SENSITIVITY_FIELD_WIDTH),
        }
    } else if code == REPORT_SELECTOR {
        Command::ReportSensitivities
    } else if code == DEBOUNCE_SELECTOR {
        Command::SetDebounce {
            micros: parse_decimal_field(&line[1..], DEBOUNCE_FIELD_WIDTH),
        }
    } else {
        Command::Unrecognized { code }
    }
}

/// C-style forgiving conversion: optional sign, then digits up to the first
/// non-digit; anything unparseable is 0. The field is cut to `width` bytes
/// first so malformed input stays bounded.
fn parse_decimal_field(field: &[u8], width: usize) -> i32 {
    let field = &field[..field.len().min(width)];
    let mut idx = 0usize;
    let mut sign = 1i32;
    match field.first() {
        Some(b'-') => {
            sign = -1;
            idx = 1;
        }
        Some(b'+') => idx = 1,
        _ => {}
    }
    let mut value = 0i32;
    while idx < field.len() && field[idx].is_ascii_digit() {
        value = value * 10 + (field[idx] - b'0') as i32;
        idx += 1;
    }
    sign * value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assemble(assembler: &mut LineAssembler, bytes: &[u8]) -> Option<std::vec::Vec<u8>> {
        let mut finished = None;
        for byte in bytes {
            if let Some(line) = assembler.feed(*byte) {
                finished = Some(line.as_slice().to_vec());
            }
        }
        finished
    }

    #[test]
    fn assembles_line_and_resets() {
        let mut assembler = LineAssembler::new();
        assert_eq!(assemble(&mut assembler, b"0750\n"), Some(b"0750".to_vec()));
        assert_eq!(assemble(&mut assembler, b"R\n"), Some(b"R".to_vec()));
    }

    #[test]
    fn discards_carriage_returns() {
        let mut assembler = LineAssembler::new();
        assert_eq!(assemble(&mut assembler, b"D2500\r\n"), Some(b"D2500".to_vec()));
    }

    #[test]
    fn ignores_empty_lines() {
        let mut assembler = LineAssembler::new();
        assert_eq!(assemble(&mut assembler, b"\n\r\n"), None);
    }

    #[test]
    fn truncates_overlong_lines_to_capacity() {
        let mut assembler = LineAssembler::new();
        let line = assemble(&mut assembler, b"0123456789999\n").expect("line");
        assert_eq!(line, b"012345678".to_vec());
        // The assembler is usable again after truncation.
        assert_eq!(assemble(&mut assembler, b"R\n"), Some(b"R".to_vec()));
    }

    #[test]
    fn parses_sensitivity_commands_per_channel() {
        assert_eq!(
            parse_command(b"0750", 4),
            Command::SetSensitivity {
                channel: 0,
                value: 750
            }
        );
        assert_eq!(
            parse_command(b"3925", 4),
            Command::SetSensitivity {
                channel: 3,
                value: 925
            }
        );
    }

    #[test]
    fn sensitivity_field_is_cut_to_four_digits() {
        assert_eq!(
            parse_command(b"012345678", 4),
            Command::SetSensitivity {
                channel: 0,
                value: 1234
            }
        );
    }

    #[test]
    fn garbage_field_converts_to_zero() {
        assert_eq!(
            parse_command(b"0abc", 4),
            Command::SetSensitivity {
                channel: 0,
                value: 0
            }
        );
    }

    #[test]
    fn parses_report_command() {
        assert_eq!(parse_command(b"R", 4), Command::ReportSensitivities);
    }

    #[test]
    fn parses_debounce_with_sign() {
        assert_eq!(parse_command(b"D2500", 4), Command::SetDebounce { micros: 2500 });
        assert_eq!(parse_command(b"D-5", 4), Command::SetDebounce { micros: -5 });
        assert_eq!(
            parse_command(b"D99999", 4),
            Command::SetDebounce { micros: 99_999 }
        );
    }

    #[test]
    fn unknown_selectors_echo_their_code() {
        assert_eq!(parse_command(b"X", 4), Command::Unrecognized { code: 40 });
        assert_eq!(parse_command(b"r", 4), Command::Unrecognized { code: 66 });
        // A selector digit past the channel count is not a channel.
        assert_eq!(parse_command(b"5100", 4), Command::Unrecognized { code: 5 });
    }
}
