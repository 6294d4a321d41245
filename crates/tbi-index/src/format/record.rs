//! Per-bulletin record encoding.
//!
//! The field order is a compatibility contract with files written by every
//! earlier version; it must not change.

use super::stream::{
    read_date, read_string, read_string_list, write_date, write_string, write_string_list,
};
use crate::bulletin::Bulletin;
use crate::error::CodecError;
use std::io::{Read, Write};

impl Bulletin {
    /// Encodes the bulletin as one record.
    ///
    /// # Errors
    ///
    /// Returns an error if a field is too long for its length prefix or
    /// writing fails.
    #[doc(alias = "encode")]
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), CodecError> {
        write_string(writer, &self.number, "number")?;
        write_string(writer, &self.title, "title")?;
        write_string(writer, &self.category, "category")?;
        write_string(writer, &self.rebuilding_kit_ref, "rebuilding kit")?;
        write_string(writer, &self.tech_pub_ref, "technical publication")?;
        write_string(writer, &self.comment, "comment")?;
        write_date(writer, self.release_date)?;
        write_string(writer, &self.registered_by, "registered by")?;
        write_string(writer, &self.replaces, "replaces")?;
        write_string(writer, &self.replaced_by, "replaced by")?;
        write_string_list(writer, &self.keywords, "keywords")?;
        Ok(())
    }

    /// Decodes one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream ends inside the record, a length
    /// prefix overruns the stream, or the release date is out of range.
    #[doc(alias = "decode")]
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self, CodecError> {
        Ok(Self {
            number: read_string(reader, "number")?,
            title: read_string(reader, "title")?,
            category: read_string(reader, "category")?,
            rebuilding_kit_ref: read_string(reader, "rebuilding kit")?,
            tech_pub_ref: read_string(reader, "technical publication")?,
            comment: read_string(reader, "comment")?,
            release_date: read_date(reader, "release date")?,
            registered_by: read_string(reader, "registered by")?,
            replaces: read_string(reader, "replaces")?,
            replaced_by: read_string(reader, "replaced by")?,
            keywords: read_string_list(reader, "keywords")?,
        })
    }

    /// Returns the encoded record as a byte vector.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut bytes = Vec::with_capacity(self.encoded_len_hint());
        self.write_to(&mut bytes)?;
        Ok(bytes)
    }

    fn encoded_len_hint(&self) -> usize {
        let strings = [
            &self.number,
            &self.title,
            &self.category,
            &self.rebuilding_kit_ref,
            &self.tech_pub_ref,
            &self.comment,
            &self.registered_by,
            &self.replaces,
            &self.replaced_by,
        ];
        let text: usize = strings.iter().map(|s| 4 + s.len()).sum();
        let keywords: usize = self.keywords.iter().map(|k| 4 + k.len()).sum();
        text + 8 + 4 + keywords
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::io::Cursor;

    fn sample() -> Bulletin {
        Bulletin {
            number: "TB-2021-014".to_string(),
            title: "Joint d'étanchéité pompe".to_string(),
            category: "Mechanical".to_string(),
            rebuilding_kit_ref: "RK-300".to_string(),
            tech_pub_ref: "RM-1234, OM-55".to_string(),
            comment: "Line one\nLine two".to_string(),
            release_date: NaiveDate::from_ymd_opt(2021, 6, 30),
            registered_by: "J. Doe".to_string(),
            replaces: "TB-2019-002".to_string(),
            replaced_by: String::new(),
            keywords: vec!["pump".to_string(), "seal".to_string()],
        }
    }

    #[test]
    fn test_record_roundtrip() {
        let tb = sample();
        let bytes = tb.to_bytes().unwrap();
        let decoded = Bulletin::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(decoded, tb);
    }

    #[test]
    fn test_empty_record_roundtrip() {
        let tb = Bulletin::default();
        let bytes = tb.to_bytes().unwrap();
        // Nine empty strings, a date and an empty keyword list.
        assert_eq!(bytes.len(), 9 * 4 + 8 + 4);
        assert_eq!(Bulletin::read_from(&mut Cursor::new(bytes)).unwrap(), tb);
    }

    #[test]
    fn test_field_order() {
        let tb = Bulletin::new("N", "T");
        let bytes = tb.to_bytes().unwrap();
        assert_eq!(&bytes[0..5], &[0, 0, 0, 1, b'N']);
        assert_eq!(&bytes[5..10], &[0, 0, 0, 1, b'T']);
    }

    #[test]
    fn test_truncated_record_fails() {
        let bytes = sample().to_bytes().unwrap();
        for cut in [0, 3, 10, bytes.len() / 2, bytes.len() - 1] {
            let result = Bulletin::read_from(&mut Cursor::new(&bytes[..cut]));
            assert!(result.is_err(), "cut at {} should fail", cut);
        }
    }

    #[test]
    fn test_records_are_self_delimiting() {
        let first = sample();
        let second = Bulletin::new("TB-2", "Second");
        let mut bytes = first.to_bytes().unwrap();
        second.write_to(&mut bytes).unwrap();

        let mut cursor = Cursor::new(bytes);
        assert_eq!(Bulletin::read_from(&mut cursor).unwrap(), first);
        assert_eq!(Bulletin::read_from(&mut cursor).unwrap(), second);
    }
}
