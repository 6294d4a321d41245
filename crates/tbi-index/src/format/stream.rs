//! Primitive field encodings shared by headers and records.

use crate::error::CodecError;
use chrono::{Datelike, NaiveDate};
use std::io::{self, Read, Write};

/// Length prefix marking a null string.
pub(crate) const NULL_LENGTH: u32 = u32::MAX;

/// Day number marking an absent date.
pub(crate) const NULL_JULIAN_DAY: i64 = i64::MIN;

/// Julian day of 0000-12-31 (proleptic Gregorian), day 0 of `num_days_from_ce`.
const JULIAN_DAY_OFFSET: i64 = 1_721_425;

/// Upper bound for buffers sized from an untrusted prefix.
const MAX_PREALLOC: usize = 64 * 1024;

fn read_array<R: Read, const N: usize>(
    reader: &mut R,
    context: &'static str,
) -> Result<[u8; N], CodecError> {
    let mut buf = [0u8; N];
    match reader.read_exact(&mut buf) {
        Ok(()) => Ok(buf),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
            Err(CodecError::UnexpectedEof { context })
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn read_i32<R: Read>(reader: &mut R, context: &'static str) -> Result<i32, CodecError> {
    read_array::<_, 4>(reader, context).map(i32::from_be_bytes)
}

pub(crate) fn read_u32<R: Read>(reader: &mut R, context: &'static str) -> Result<u32, CodecError> {
    read_array::<_, 4>(reader, context).map(u32::from_be_bytes)
}

pub(crate) fn read_i64<R: Read>(reader: &mut R, context: &'static str) -> Result<i64, CodecError> {
    read_array::<_, 8>(reader, context).map(i64::from_be_bytes)
}

/// Reads a signed count that must not be negative.
pub(crate) fn read_count<R: Read>(
    reader: &mut R,
    context: &'static str,
) -> Result<u32, CodecError> {
    let count = read_i32(reader, context)?;
    u32::try_from(count).map_err(|_| CodecError::NegativeCount { context, count })
}

/// Reads a length-prefixed byte string. A null string reads as empty.
pub(crate) fn read_bytes<R: Read>(
    reader: &mut R,
    context: &'static str,
) -> Result<Vec<u8>, CodecError> {
    let declared = read_u32(reader, context)?;
    if declared == NULL_LENGTH {
        return Ok(Vec::new());
    }

    let mut buf = Vec::with_capacity((declared as usize).min(MAX_PREALLOC));
    let available = reader
        .by_ref()
        .take(u64::from(declared))
        .read_to_end(&mut buf)?;
    if available < declared as usize {
        return Err(CodecError::LengthOverrun {
            context,
            declared,
            available,
        });
    }
    Ok(buf)
}

/// Reads a length-prefixed UTF-8 string, replacing invalid sequences.
pub(crate) fn read_string<R: Read>(
    reader: &mut R,
    context: &'static str,
) -> Result<String, CodecError> {
    let bytes = read_bytes(reader, context)?;
    Ok(match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

pub(crate) fn read_string_list<R: Read>(
    reader: &mut R,
    context: &'static str,
) -> Result<Vec<String>, CodecError> {
    let count = read_u32(reader, context)?;
    let mut list = Vec::with_capacity((count as usize).min(MAX_PREALLOC));
    for _ in 0..count {
        list.push(read_string(reader, context)?);
    }
    Ok(list)
}

pub(crate) fn read_date<R: Read>(
    reader: &mut R,
    context: &'static str,
) -> Result<Option<NaiveDate>, CodecError> {
    let julian_day = read_i64(reader, context)?;
    if julian_day == NULL_JULIAN_DAY {
        return Ok(None);
    }
    julian_day_to_date(julian_day)
        .map(Some)
        .ok_or(CodecError::InvalidDate(julian_day))
}

pub(crate) fn write_i32<W: Write>(writer: &mut W, value: i32) -> Result<(), CodecError> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

pub(crate) fn write_u32<W: Write>(writer: &mut W, value: u32) -> Result<(), CodecError> {
    writer.write_all(&value.to_be_bytes())?;
    Ok(())
}

/// Writes a non-negative count into a signed 32-bit field.
pub(crate) fn write_count<W: Write>(
    writer: &mut W,
    count: usize,
    context: &'static str,
) -> Result<(), CodecError> {
    let value = i32::try_from(count).map_err(|_| CodecError::CountOverflow { context, count })?;
    write_i32(writer, value)
}

pub(crate) fn write_string<W: Write>(
    writer: &mut W,
    value: &str,
    context: &'static str,
) -> Result<(), CodecError> {
    let len = u32::try_from(value.len())
        .ok()
        .filter(|&len| len != NULL_LENGTH)
        .ok_or(CodecError::CountOverflow {
            context,
            count: value.len(),
        })?;
    write_u32(writer, len)?;
    writer.write_all(value.as_bytes())?;
    Ok(())
}

pub(crate) fn write_string_list<W: Write>(
    writer: &mut W,
    values: &[String],
    context: &'static str,
) -> Result<(), CodecError> {
    let count = u32::try_from(values.len()).map_err(|_| CodecError::CountOverflow {
        context,
        count: values.len(),
    })?;
    write_u32(writer, count)?;
    for value in values {
        write_string(writer, value, context)?;
    }
    Ok(())
}

pub(crate) fn write_date<W: Write>(
    writer: &mut W,
    date: Option<NaiveDate>,
) -> Result<(), CodecError> {
    let julian_day = date.map_or(NULL_JULIAN_DAY, date_to_julian_day);
    writer.write_all(&julian_day.to_be_bytes())?;
    Ok(())
}

pub(crate) fn date_to_julian_day(date: NaiveDate) -> i64 {
    i64::from(date.num_days_from_ce()) + JULIAN_DAY_OFFSET
}

pub(crate) fn julian_day_to_date(julian_day: i64) -> Option<NaiveDate> {
    julian_day
        .checked_sub(JULIAN_DAY_OFFSET)
        .and_then(|days| i32::try_from(days).ok())
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_julian_day_reference_points() {
        let y2k = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        assert_eq!(date_to_julian_day(y2k), 2_451_545);
        let unix = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
        assert_eq!(date_to_julian_day(unix), 2_440_588);
        assert_eq!(julian_day_to_date(2_451_545), Some(y2k));
    }

    #[test]
    fn test_date_null_sentinel() {
        let mut buf = Vec::new();
        write_date(&mut buf, None).unwrap();
        assert_eq!(buf, i64::MIN.to_be_bytes());
        assert_eq!(read_date(&mut Cursor::new(buf), "date").unwrap(), None);
    }

    #[test]
    fn test_date_out_of_range_rejected() {
        let buf = i64::MAX.to_be_bytes();
        let err = read_date(&mut Cursor::new(buf), "date").unwrap_err();
        assert!(matches!(err, CodecError::InvalidDate(i64::MAX)));
    }

    #[test]
    fn test_string_layout_is_big_endian_prefixed() {
        let mut buf = Vec::new();
        write_string(&mut buf, "é", "s").unwrap();
        assert_eq!(buf, vec![0, 0, 0, 2, 0xC3, 0xA9]);
    }

    #[test]
    fn test_null_string_reads_empty() {
        let buf = NULL_LENGTH.to_be_bytes();
        assert_eq!(read_string(&mut Cursor::new(buf), "s").unwrap(), "");
    }

    #[test]
    fn test_length_overrun() {
        let mut buf = 10u32.to_be_bytes().to_vec();
        buf.extend_from_slice(b"abc");
        let err = read_string(&mut Cursor::new(buf), "title").unwrap_err();
        assert!(matches!(
            err,
            CodecError::LengthOverrun {
                context: "title",
                declared: 10,
                available: 3
            }
        ));
    }

    #[test]
    fn test_truncated_prefix_is_unexpected_eof() {
        let err = read_i32(&mut Cursor::new([0u8, 1]), "count").unwrap_err();
        assert!(matches!(err, CodecError::UnexpectedEof { context: "count" }));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut buf = 2u32.to_be_bytes().to_vec();
        buf.extend_from_slice(&[0xFF, b'a']);
        assert_eq!(read_string(&mut Cursor::new(buf), "s").unwrap(), "\u{FFFD}a");
    }

    #[test]
    fn test_negative_count_rejected() {
        let buf = (-3i32).to_be_bytes();
        let err = read_count(&mut Cursor::new(buf), "record count").unwrap_err();
        assert!(matches!(err, CodecError::NegativeCount { count: -3, .. }));
    }

    #[test]
    fn test_string_list_roundtrip() {
        let list = vec!["pump".to_string(), String::new(), "joint à lèvre".to_string()];
        let mut buf = Vec::new();
        write_string_list(&mut buf, &list, "keywords").unwrap();
        assert_eq!(read_string_list(&mut Cursor::new(buf), "keywords").unwrap(), list);
    }
}
