//! A thin textual view over VCF lines. Records are kept as borrowed column
//! slices so untouched lines can be written back byte-for-byte.

use crate::error::{Error, Result};

/// Number of fixed columns up to and including INFO.
pub const MIN_COLUMNS: usize = 8;

const POS_COLUMN: usize = 1;
const REF_COLUMN: usize = 3;
const ALT_COLUMN: usize = 4;
const INFO_COLUMN: usize = 7;

/// Header lines (`##meta` and `#CHROM`) start with '#'.
pub fn is_header(line: &str) -> bool {
    line.starts_with('#')
}

/// One data line of a VCF split on tabs. `line` is 1-based and only used for messages.
#[derive(Debug, Clone)]
pub struct TextRecord<'a> {
    line: usize,
    text: &'a str,
    columns: Vec<&'a str>,
    position: u64,
}

impl<'a> TextRecord<'a> {
    pub fn parse(line: usize, text: &'a str) -> Result<Self> {
        let columns: Vec<&str> = text.split('\t').collect();
        if columns.len() < MIN_COLUMNS {
            return Err(Error::TooFewColumns {
                line,
                expected: MIN_COLUMNS,
                found: columns.len(),
            });
        }
        let position = columns[POS_COLUMN]
            .parse::<u64>()
            .map_err(|_| Error::InvalidNumber {
                line,
                what: "POS",
                value: columns[POS_COLUMN].to_string(),
            })?;
        Ok(TextRecord {
            line,
            text,
            columns,
            position,
        })
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn chrom(&self) -> &'a str {
        self.columns[0]
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    pub fn reference(&self) -> &'a str {
        self.columns[REF_COLUMN]
    }

    pub fn alternate(&self) -> &'a str {
        self.columns[ALT_COLUMN]
    }

    pub fn info(&self) -> Info<'a> {
        Info(self.columns[INFO_COLUMN])
    }

    /// Records flagged with the INDEL INFO flag.
    pub fn is_indel(&self) -> bool {
        self.info().has_flag("INDEL")
    }

    /// Value of `key`, failing with a descriptive error when absent.
    pub fn require(&self, key: &'static str) -> Result<&'a str> {
        self.info().get(key).ok_or(Error::MissingInfo {
            line: self.line,
            key,
        })
    }

    /// Integer value of `key`.
    pub fn require_int(&self, key: &'static str) -> Result<i64> {
        let value = self.require(key)?;
        parse_int(self.line, key, value)
    }

    /// Rebuild the line with the INFO entries in `replacements` given new values.
    /// Every other column and INFO entry is copied verbatim.
    pub fn with_info_values(&self, replacements: &[(&str, &str)]) -> String {
        let info = self.columns[INFO_COLUMN]
            .split(';')
            .map(|entry| {
                let key = entry.split_once('=').map_or(entry, |(k, _)| k);
                match replacements.iter().find(|(k, _)| *k == key) {
                    Some((k, v)) => format!("{}={}", k, v),
                    None => entry.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(";");
        let mut columns: Vec<&str> = self.columns.iter().copied().collect();
        columns[INFO_COLUMN] = &info;
        columns.join("\t")
    }
}

pub(crate) fn parse_int(line: usize, what: &'static str, value: &str) -> Result<i64> {
    value.trim().parse::<i64>().map_err(|_| Error::InvalidNumber {
        line,
        what,
        value: value.to_string(),
    })
}

/// Semicolon-separated `KEY=VALUE` list of a record's INFO column.
#[derive(Debug, Clone, Copy)]
pub struct Info<'a>(&'a str);

impl<'a> Info<'a> {
    pub fn new(info: &'a str) -> Self {
        Info(info)
    }

    fn entries(&self) -> impl Iterator<Item = (&'a str, Option<&'a str>)> {
        self.0.split(';').map(|entry| match entry.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (entry, None),
        })
    }

    /// Value of the first entry named `key`. Flags have no value and yield `None`.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.entries().find(|(k, _)| *k == key).and_then(|(_, v)| v)
    }

    pub fn has_flag(&self, key: &str) -> bool {
        self.entries().any(|(k, _)| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEL: &str = "chr1\t1000\t.\tACGT\tA\t50\t.\tINDEL;IDV=12;IMF=0.6;DP=20;DP4=5,5,4,6;AD=10,10\tGT\t0/1";

    #[test]
    fn test_parse_record_columns() {
        let rec = TextRecord::parse(3, INDEL).unwrap();
        assert_eq!(rec.chrom(), "chr1");
        assert_eq!(rec.position(), 1000);
        assert_eq!(rec.reference(), "ACGT");
        assert_eq!(rec.alternate(), "A");
        assert!(rec.is_indel());
        assert_eq!(rec.require("DP4").unwrap(), "5,5,4,6");
        assert_eq!(rec.require_int("IDV").unwrap(), 12);
    }

    #[test]
    fn test_dp_does_not_match_idv_or_dp4() {
        let info = Info::new("IDV=3;DP4=1,2,3,4;DP=9");
        assert_eq!(info.get("DP"), Some("9"));
        assert!(!info.has_flag("INDEL"));
    }

    #[test]
    fn test_missing_key_is_reported() {
        let rec = TextRecord::parse(7, "chr1\t5\t.\tA\tC\t1\t.\tDP=4").unwrap();
        match rec.require("AD") {
            Err(Error::MissingInfo { line, key }) => {
                assert_eq!(line, 7);
                assert_eq!(key, "AD");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_too_few_columns() {
        assert!(matches!(
            TextRecord::parse(1, "chr1\t5\tA"),
            Err(Error::TooFewColumns { found: 3, .. })
        ));
        assert!(matches!(
            TextRecord::parse(1, "chr1\tx\t.\tA\tC\t1\t.\tDP=4"),
            Err(Error::InvalidNumber { what: "POS", .. })
        ));
    }

    #[test]
    fn test_with_info_values_only_touches_named_keys() {
        let rec = TextRecord::parse(1, INDEL).unwrap();
        let out = rec.with_info_values(&[("AD", "15,10")]);
        assert_eq!(
            out,
            "chr1\t1000\t.\tACGT\tA\t50\t.\tINDEL;IDV=12;IMF=0.6;DP=20;DP4=5,5,4,6;AD=15,10\tGT\t0/1"
        );
    }

    #[test]
    fn test_is_header() {
        assert!(is_header("##fileformat=VCFv4.2"));
        assert!(is_header("#CHROM\tPOS"));
        assert!(!is_header("chr1\t1"));
    }
}
