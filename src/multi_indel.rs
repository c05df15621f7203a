//! Removal of the lowest-AD call at sites carrying more than one IMF-bearing indel.
//!
//! Records are parsed with htslib, but the output is the input text with the
//! removed records left out, so every other line is kept byte-for-byte.

use std::path::Path;

use log::{debug, info};
use rust_htslib::bcf::{self, header::TagType, Read};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};
use crate::info::is_header;
use crate::vcf_io::{read_lines, temporary_sibling, write_lines};

/// An IMF-bearing record. `index` is its ordinal among data records, `position` is 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndelCall {
    pub index: usize,
    pub chrom: String,
    pub position: i64,
    pub alt: Vec<String>,
    pub ad: Vec<i32>,
}

/// A site with several indel calls and the AD that will be removed from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredSite {
    pub chrom: String,
    pub position: i64,
    pub ad: Vec<i32>,
}

impl FilteredSite {
    pub fn ad_string(&self) -> String {
        self.ad
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// `##` line recording the removal, placed after the existing meta lines.
    pub fn header_line(&self) -> String {
        format!(
            "##multi_indel_filter removed an INDEL at CHROM={} POS={} with AD={}",
            self.chrom,
            self.position,
            self.ad_string()
        )
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FilterStats {
    pub records: usize,
    pub indels: usize,
    pub removed: usize,
    pub sites: Vec<FilteredSite>,
}

fn chrom_name(record: &bcf::Record) -> String {
    record
        .rid()
        .and_then(|rid| record.header().rid2name(rid).ok())
        .map(|c| String::from_utf8_lossy(c).to_string())
        .unwrap_or_default()
}

/// True when the record carries `tag` with any value, whatever its declared type.
fn has_info(record: &bcf::Record, tag: &[u8]) -> bool {
    let typ = match record.header().info_type(tag) {
        Ok((typ, _)) => typ,
        Err(_) => return false,
    };
    let mut info = record.info(tag);
    match typ {
        TagType::Flag => info.flag().unwrap_or(false),
        TagType::Integer => matches!(info.integer(), Ok(Some(_))),
        TagType::Float => matches!(info.float(), Ok(Some(_))),
        TagType::String => matches!(info.string(), Ok(Some(_))),
    }
}

/// AD values of a record, declared either as Integer or as a comma-separated String.
fn allele_depths(record: &bcf::Record) -> Result<Option<Vec<i32>>> {
    let chrom = || chrom_name(record);
    let typ = match record.header().info_type(b"AD") {
        Ok((typ, _)) => typ,
        Err(_) => return Ok(None),
    };
    let info = record.info(b"AD");
    match typ {
        TagType::Integer => Ok(info
            .integer()
            .ok()
            .flatten()
            .map(|v| v.iter().copied().collect())),
        TagType::String => {
            let values = match info.string().ok().flatten() {
                Some(v) => v,
                None => return Ok(None),
            };
            let mut ad = Vec::new();
            for part in values.iter().flat_map(|s| s.split(|&b| b == b',')) {
                let text = String::from_utf8_lossy(part);
                let v = text.trim().parse::<i32>().map_err(|_| Error::InvalidAd {
                    chrom: chrom(),
                    position: record.pos() + 1,
                    value: text.to_string(),
                })?;
                ad.push(v);
            }
            Ok(Some(ad))
        }
        _ => Err(Error::InvalidAd {
            chrom: chrom(),
            position: record.pos() + 1,
            value: format!("unsupported AD type {:?}", typ),
        }),
    }
}

/// Collect every record carrying IMF. Each one must have an AD.
pub fn collect_indels(records: &[bcf::Record]) -> Result<Vec<IndelCall>> {
    let mut indels = Vec::new();
    for (index, record) in records.iter().enumerate() {
        if !has_info(record, b"IMF") {
            continue;
        }
        let chrom = chrom_name(record);
        let position = record.pos() + 1;
        let ad = allele_depths(record)?.ok_or_else(|| Error::MissingAd {
            chrom: chrom.clone(),
            position,
        })?;
        let alt = record
            .alleles()
            .iter()
            .skip(1)
            .map(|a| String::from_utf8_lossy(a).to_string())
            .collect();
        indels.push(IndelCall {
            index,
            chrom,
            position,
            alt,
            ad,
        });
    }
    Ok(indels)
}

/// Sites holding at least two indel calls, each with the minimum AD among its calls.
/// Sites are returned in the order they first appear.
pub fn find_min_multi_imf(indels: &[IndelCall]) -> Vec<FilteredSite> {
    let mut order: Vec<(&str, i64)> = Vec::new();
    let mut groups: FxHashMap<(&str, i64), Vec<&Vec<i32>>> = FxHashMap::default();
    for call in indels {
        let key = (call.chrom.as_str(), call.position);
        groups
            .entry(key)
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(&call.ad);
    }
    order
        .into_iter()
        .filter_map(|key| {
            let ads = &groups[&key];
            if ads.len() < 2 {
                return None;
            }
            ads.iter().min().map(|ad| FilteredSite {
                chrom: key.0.to_string(),
                position: key.1,
                ad: (*ad).clone(),
            })
        })
        .collect()
}

/// Record indices of the indel calls whose AD is the minimum at a filtered site.
/// Ties are all removed.
pub fn removed_records(indels: &[IndelCall], sites: &[FilteredSite]) -> FxHashSet<usize> {
    let by_site: FxHashMap<(&str, i64), &Vec<i32>> = sites
        .iter()
        .map(|s| ((s.chrom.as_str(), s.position), &s.ad))
        .collect();
    let mut removed = FxHashSet::default();
    for call in indels {
        let key = (call.chrom.as_str(), call.position);
        if by_site.get(&key).is_some_and(|min| **min == call.ad) {
            debug!(
                "removing indel {}:{} ALT={} AD={:?}",
                call.chrom,
                call.position,
                call.alt.join(","),
                call.ad
            );
            removed.insert(call.index);
        }
    }
    removed
}

/// Copy `lines` leaving out the removed data records and adding `meta` just before `#CHROM`.
/// Blank lines are not records.
pub fn splice_lines(
    lines: Vec<String>,
    removed: &FxHashSet<usize>,
    meta: &[String],
) -> (Vec<String>, usize) {
    let mut out = Vec::with_capacity(lines.len() + meta.len());
    let mut index = 0;
    for line in lines {
        if line.starts_with("#CHROM") {
            out.extend(meta.iter().cloned());
        }
        if is_header(&line) || line.trim().is_empty() {
            out.push(line);
            continue;
        }
        if !removed.contains(&index) {
            out.push(line);
        }
        index += 1;
    }
    (out, index)
}

/// Filter duplicate indel calls in `input`, writing to `output` (which may be `input`).
/// The file is left untouched when no site needs filtering.
pub fn filter_multi_indel(input: &Path, output: &Path) -> Result<FilterStats> {
    let mut reader = bcf::Reader::from_path(input).map_err(|e| Error::htslib(input, e))?;
    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::htslib(input, e))?;
    drop(reader);

    let indels = collect_indels(&records)?;
    let mut stats = FilterStats {
        records: records.len(),
        indels: indels.len(),
        sites: find_min_multi_imf(&indels),
        ..Default::default()
    };
    if stats.sites.is_empty() {
        info!(
            "{} IMF-bearing records in {}, no site with more than one",
            stats.indels,
            input.display()
        );
        copy_unchanged(input, output)?;
        return Ok(stats);
    }

    let removed = removed_records(&indels, &stats.sites);
    stats.removed = removed.len();
    let meta: Vec<String> = stats.sites.iter().map(FilteredSite::header_line).collect();
    let (lines, data_lines) = splice_lines(read_lines(input)?, &removed, &meta);
    if data_lines != stats.records {
        return Err(Error::RecordCount {
            path: input.to_path_buf(),
            lines: data_lines,
            records: stats.records,
        });
    }
    replace_file(output, &lines)?;

    info!(
        "{} records, {} indels, {} sites with multiple indels, {} records removed",
        stats.records,
        stats.indels,
        stats.sites.len(),
        stats.removed
    );
    Ok(stats)
}

fn copy_unchanged(input: &Path, output: &Path) -> Result<()> {
    if input != output {
        std::fs::copy(input, output).map_err(|e| Error::io(output, e))?;
    }
    Ok(())
}

/// Write through a temporary sibling and rename it over `output` once complete.
fn replace_file(output: &Path, lines: &[String]) -> Result<()> {
    let tmp = temporary_sibling(output);
    let written = write_lines(&tmp, lines)
        .and_then(|_| std::fs::rename(&tmp, output).map_err(|e| Error::io(output, e)));
    if written.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    written?;
    info!("wrote {}", output.display());
    Ok(())
}
