use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Marker separating the sample name from the rest of a pre-bcftools VCF name.
pub const INPUT_MARKER: &str = "_pre_b";
/// Suffix of the depth-corrected output.
pub const OUTPUT_SUFFIX: &str = "_pre1.vcf";

/// `sample_pre_bcftools.vcf` becomes `sample_pre1.vcf`. Without the marker the
/// whole input path is used as the prefix.
pub fn derive_output_path(input: &Path) -> PathBuf {
    let text = input.to_string_lossy();
    let prefix = match text.find(INPUT_MARKER) {
        Some(idx) => &text[..idx],
        None => {
            log::warn!(
                "input {} does not contain '{}', appending '{}'",
                text,
                INPUT_MARKER,
                OUTPUT_SUFFIX
            );
            &text[..]
        }
    };
    PathBuf::from(format!("{}{}", prefix, OUTPUT_SUFFIX))
}

/// Sibling path used while rewriting `path` in place.
pub fn temporary_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".indelfix.tmp");
    path.with_file_name(name)
}

/// Read all lines, stripping line terminators only.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    BufReader::new(file)
        .lines()
        .map(|l| {
            l.map(|mut l| {
                if l.ends_with('\r') {
                    l.pop();
                }
                l
            })
            .map_err(|e| Error::io(path, e))
        })
        .collect()
}

pub fn write_lines<I, S>(path: &Path, lines: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let file = File::create(path).map_err(|e| Error::io(path, e))?;
    let mut wtr = BufWriter::new(file);
    for line in lines {
        writeln!(wtr, "{}", line.as_ref()).map_err(|e| Error::io(path, e))?;
    }
    wtr.flush().map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_output_path() {
        assert_eq!(
            derive_output_path(Path::new("/data/S1_pre_bcftools.vcf")),
            PathBuf::from("/data/S1_pre1.vcf")
        );
        assert_eq!(
            derive_output_path(Path::new("S1.vcf")),
            PathBuf::from("S1.vcf_pre1.vcf")
        );
    }

    #[test]
    fn test_temporary_sibling() {
        assert_eq!(
            temporary_sibling(Path::new("/x/y.vcf")),
            PathBuf::from("/x/y.vcf.indelfix.tmp")
        );
    }

    #[test]
    fn test_read_write_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.vcf");
        write_lines(&path, ["##a", "b\tc"]).unwrap();
        std::fs::write(dir.path().join("crlf.vcf"), "x\r\ny\r\n").unwrap();
        assert_eq!(read_lines(&path).unwrap(), vec!["##a", "b\tc"]);
        assert_eq!(
            read_lines(&dir.path().join("crlf.vcf")).unwrap(),
            vec!["x", "y"]
        );
        assert!(matches!(
            read_lines(&dir.path().join("missing.vcf")),
            Err(Error::Io { .. })
        ));
    }
}
