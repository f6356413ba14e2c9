//! Adobe/Resolve `.cube` format parsing.
//!
//! The `.cube` format is a simple text-based LUT format widely supported
//! by DaVinci Resolve, Adobe applications, and many other tools.
//!
//! # Format
//!
//! ```text
//! # Comment
//! TITLE "LUT Name"
//! LUT_3D_SIZE 33
//! DOMAIN_MIN 0.0 0.0 0.0
//! DOMAIN_MAX 1.0 1.0 1.0
//! 0.0 0.0 0.0
//! ...
//! 1.0 1.0 1.0
//! ```
//!
//! Data rows are in red-fastest order, which is also the in-memory order
//! of [`Lut3d`], so rows are appended without reordering. Channel values
//! outside [0, 1] are clamped, not rejected.

use crate::{Lut3d, ParseError, ParseResult};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Smallest accepted LUT_3D_SIZE.
const MIN_SIZE: usize = 2;
/// Largest accepted LUT_3D_SIZE.
const MAX_SIZE: usize = 256;

/// Reads a 3D LUT from a `.cube` file.
pub fn read<P: AsRef<Path>>(path: P) -> ParseResult<Lut3d> {
    let file = File::open(path.as_ref())?;
    parse(BufReader::new(file))
}

/// Parses a 3D LUT from a reader.
pub fn parse<R: BufRead>(reader: R) -> ParseResult<Lut3d> {
    let mut size: Option<usize> = None;
    let mut data: Vec<f32> = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let lineno = idx + 1;
        let line = line?;
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if line.starts_with("TITLE") || line.starts_with("DOMAIN_MIN") || line.starts_with("DOMAIN_MAX") {
            // Recognized but unused keywords
            continue;
        } else if line.starts_with("LUT_3D_SIZE") {
            size = Some(parse_size(line, lineno)?);
        } else if line.starts_with("LUT_1D_SIZE") {
            return Err(ParseError::MalformedHeader {
                line: lineno,
                msg: "expected 3D LUT, found 1D".into(),
            });
        } else {
            // Data row: 3 whitespace-separated floats, clamped to [0, 1]
            let rgb = parse_rgb(line, lineno)?;
            data.extend_from_slice(&rgb);
        }
    }

    let size = size.ok_or(ParseError::MissingSize)?;
    let expected = size * size * size;
    let found = data.len() / 3;
    if found != expected {
        return Err(ParseError::RowCountMismatch { expected, found });
    }

    Lut3d::from_data(data, size)
}

fn parse_size(line: &str, lineno: usize) -> ParseResult<usize> {
    let mut parts = line.split_whitespace();
    let _keyword = parts.next();
    let value = parts.next().ok_or(ParseError::MalformedHeader {
        line: lineno,
        msg: "LUT_3D_SIZE missing value".into(),
    })?;
    let size: usize = value.parse().map_err(|_| ParseError::MalformedHeader {
        line: lineno,
        msg: format!("invalid LUT_3D_SIZE value: {value}"),
    })?;
    if !(MIN_SIZE..=MAX_SIZE).contains(&size) {
        return Err(ParseError::MalformedHeader {
            line: lineno,
            msg: format!("LUT_3D_SIZE {size} out of range [{MIN_SIZE}, {MAX_SIZE}]"),
        });
    }
    Ok(size)
}

fn parse_rgb(line: &str, lineno: usize) -> ParseResult<[f32; 3]> {
    let mut out = [0.0f32; 3];
    let mut parts = line.split_whitespace();
    for v in &mut out {
        let part = parts
            .next()
            .ok_or(ParseError::InvalidChannelValue { line: lineno })?;
        let value: f32 = part
            .parse()
            .map_err(|_| ParseError::InvalidChannelValue { line: lineno })?;
        if !value.is_finite() {
            return Err(ParseError::InvalidChannelValue { line: lineno });
        }
        *v = value.clamp(0.0, 1.0);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parse_minimal_cube() {
        let cube = r#"
# Test LUT
TITLE "Test Grade"
LUT_3D_SIZE 2
DOMAIN_MIN 0.0 0.0 0.0
DOMAIN_MAX 1.0 1.0 1.0

0.0 0.0 0.0
1.0 0.0 0.0
0.0 1.0 0.0
1.0 1.0 0.0
0.0 0.0 1.0
1.0 0.0 1.0
0.0 1.0 1.0
1.0 1.0 1.0
"#;
        let lut = parse(Cursor::new(cube)).expect("parse failed");
        assert_eq!(lut.size(), 2);
        // Rows are kept in file order: second row is grid point (1,0,0)
        assert_eq!(&lut.data()[3..6], &[1.0, 0.0, 0.0]);
    }

    #[test]
    fn parse_missing_size() {
        let cube = "0.0 0.0 0.0\n";
        assert!(matches!(parse(Cursor::new(cube)), Err(ParseError::MissingSize)));
    }

    #[test]
    fn parse_row_count_mismatch() {
        let cube = "LUT_3D_SIZE 2\n0.0 0.0 0.0\n1.0 1.0 1.0\n";
        let err = parse(Cursor::new(cube)).unwrap_err();
        assert!(matches!(err, ParseError::RowCountMismatch { expected: 8, found: 2 }));
    }

    #[test]
    fn parse_bad_channel_reports_line() {
        let cube = "LUT_3D_SIZE 2\n0.0 0.0 0.0\n0.0 abc 0.0\n";
        let err = parse(Cursor::new(cube)).unwrap_err();
        assert!(matches!(err, ParseError::InvalidChannelValue { line: 3 }));
    }

    #[test]
    fn parse_clamps_out_of_range_values() {
        let mut cube = String::from("LUT_3D_SIZE 2\n");
        cube.push_str("-0.5 0.0 0.0\n");
        for _ in 0..6 {
            cube.push_str("0.5 0.5 0.5\n");
        }
        cube.push_str("1.0 1.0 2.5\n");
        let lut = parse(Cursor::new(cube.as_str())).expect("parse failed");
        assert_eq!(lut.data()[0], 0.0);
        assert_eq!(lut.data()[23], 1.0);
    }

    #[test]
    fn parse_size_out_of_range() {
        let cube = "LUT_3D_SIZE 1\n";
        assert!(matches!(
            parse(Cursor::new(cube)),
            Err(ParseError::MalformedHeader { line: 1, .. })
        ));
    }
}
