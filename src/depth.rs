//! Indel depth correction. Deletions whose IDV is a large share of the
//! surrounding non-indel depth get their AD rebuilt from that depth.
//!
//! The transform runs in two phases: `collect` walks the lines and decides,
//! for every deletion candidate, whether it is accepted and which accepted
//! indel wins at each site; `emit` then writes every line exactly once.

use std::path::Path;

use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Direction, Error, Result};
use crate::info::{is_header, parse_int, TextRecord};
use crate::vcf_io;

/// Thresholds for accepting a correction.
#[derive(Debug, Clone)]
pub struct CorrectionParams {
    /// Minimum IDV / max neighbor DP for an indel to be corrected.
    pub min_idv_fraction: f64,
    /// Alternate alleles at least this long are never corrected.
    pub max_indel_length: usize,
    /// Drop candidates that fail the IDV test instead of passing them through.
    pub drop_unaccepted: bool,
    /// Also rewrite DP4 from the corrected depths.
    pub rewrite_dp4: bool,
}

impl Default for CorrectionParams {
    fn default() -> Self {
        CorrectionParams {
            min_idv_fraction: 0.5,
            max_indel_length: 500,
            drop_unaccepted: false,
            rewrite_dp4: false,
        }
    }
}

/// Header and blank lines are copied through untouched.
enum Entry<'a> {
    Verbatim(&'a str),
    Record(TextRecord<'a>),
}

/// An accepted indel and the depths computed for it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Correction {
    /// Index of the line in the input.
    pub index: usize,
    pub position: u64,
    /// Alt component of AD, kept as written.
    pub alt_depth_text: String,
    pub alt_depth: i64,
    pub max_dp: i64,
    pub replacement_ref: i64,
}

impl Correction {
    pub fn ad(&self) -> String {
        format!("{},{}", self.replacement_ref, self.alt_depth_text)
    }

    pub fn dp4(&self) -> String {
        let r = self.replacement_ref / 2;
        let a = self.alt_depth / 2;
        format!("{},{},{},{}", r, r, a, a)
    }
}

/// What `collect` decided, handed to `emit`.
#[derive(Debug, Default)]
pub(crate) struct Collected {
    /// Winning correction per (chrom, position), keyed by line index.
    pub retained: FxHashMap<usize, Correction>,
    /// Accepted indels that lost to another indel at the same site.
    pub superseded: FxHashSet<usize>,
    /// Candidates below the IDV threshold.
    pub unaccepted: FxHashSet<usize>,
}

/// Summary of a correction run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CorrectionStats {
    pub records: usize,
    pub candidates: usize,
    pub corrected: usize,
    pub superseded: usize,
    pub unaccepted: usize,
}

fn parse_entries<'a, S: AsRef<str>>(lines: &'a [S]) -> Result<Vec<Entry<'a>>> {
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| {
            let l = l.as_ref();
            if is_header(l) || l.trim().is_empty() {
                Ok(Entry::Verbatim(l))
            } else {
                TextRecord::parse(i + 1, l).map(Entry::Record)
            }
        })
        .collect()
}

fn record_at<'e, 'a>(entries: &'e [Entry<'a>], idx: usize) -> Option<&'e TextRecord<'a>> {
    match entries.get(idx) {
        Some(Entry::Record(r)) => Some(r),
        _ => None,
    }
}

/// DP of the line before the nearest preceding non-indel record at or before `rec`.
fn previous_depth(entries: &[Entry], idx: usize, rec: &TextRecord) -> Result<i64> {
    let no_neighbor = || Error::NoNeighbor {
        line: rec.line(),
        position: rec.position(),
        direction: Direction::Backward,
    };
    let mut j = idx;
    loop {
        j = j.checked_sub(1).ok_or_else(no_neighbor)?;
        let other = record_at(entries, j).ok_or_else(no_neighbor)?;
        if !other.is_indel() && other.position() <= rec.position() {
            break;
        }
    }
    let before = j
        .checked_sub(1)
        .and_then(|k| record_at(entries, k))
        .ok_or_else(no_neighbor)?;
    before.require_int("DP")
}

/// DP of the line after the nearest following non-indel record past the deleted bases.
fn next_depth(entries: &[Entry], idx: usize, rec: &TextRecord) -> Result<i64> {
    let no_neighbor = || Error::NoNeighbor {
        line: rec.line(),
        position: rec.position(),
        direction: Direction::Forward,
    };
    let end = rec.position() + rec.reference().len() as u64;
    let mut j = idx;
    loop {
        j += 1;
        let other = record_at(entries, j).ok_or_else(no_neighbor)?;
        if !other.is_indel() && other.position() >= end {
            break;
        }
    }
    let after = record_at(entries, j + 1).ok_or_else(no_neighbor)?;
    after.require_int("DP")
}

/// Deletions shorter than `max_indel_length` are the only correction candidates.
pub fn is_candidate(rec: &TextRecord, params: &CorrectionParams) -> bool {
    let ref_length = rec.reference().len();
    let indel_length = rec.alternate().len();
    indel_length < ref_length && indel_length < params.max_indel_length
}

fn evaluate(entries: &[Entry], idx: usize, rec: &TextRecord) -> Result<(Correction, i64)> {
    // all of these must be present on an indel line
    let idv = rec.require_int("IDV")?;
    rec.require("DP")?;
    rec.require("DP4")?;
    let ad = rec.require("AD")?;

    let prev_dp = previous_depth(entries, idx, rec)?;
    let next_dp = next_depth(entries, idx, rec)?;
    let max_dp = prev_dp.max(next_dp);

    let alt_depth_text = ad.split(',').nth(1).ok_or_else(|| Error::InvalidNumber {
        line: rec.line(),
        what: "alt AD",
        value: ad.to_string(),
    })?;
    let alt_depth = parse_int(rec.line(), "alt AD", alt_depth_text)?;

    Ok((
        Correction {
            index: idx,
            position: rec.position(),
            alt_depth_text: alt_depth_text.to_string(),
            alt_depth,
            max_dp,
            replacement_ref: max_dp - alt_depth,
        },
        idv,
    ))
}

fn collect(entries: &[Entry], params: &CorrectionParams) -> Result<Collected> {
    let mut collected = Collected::default();
    let mut by_site: FxHashMap<(&str, u64), Correction> = FxHashMap::default();

    for (idx, entry) in entries.iter().enumerate() {
        let rec = match entry {
            Entry::Record(r) if r.is_indel() && is_candidate(r, params) => r,
            _ => continue,
        };
        let (correction, idv) = evaluate(entries, idx, rec)?;
        if (idv as f64) < correction.max_dp as f64 * params.min_idv_fraction {
            debug!(
                "{}:{} IDV={} below {} of max DP {}",
                rec.chrom(),
                rec.position(),
                idv,
                params.min_idv_fraction,
                correction.max_dp
            );
            collected.unaccepted.insert(idx);
            continue;
        }
        let site = (rec.chrom(), rec.position());
        match by_site.get(&site) {
            // ties go to the later indel
            Some(kept) if correction.alt_depth < kept.alt_depth => {
                debug!("{}:{} keeps line {}", site.0, site.1, kept.index + 1);
                collected.superseded.insert(idx);
            }
            Some(kept) => {
                debug!("{}:{} replaces line {}", site.0, site.1, kept.index + 1);
                collected.superseded.insert(kept.index);
                by_site.insert(site, correction);
            }
            None => {
                by_site.insert(site, correction);
            }
        }
    }
    collected.retained = by_site.into_values().map(|c| (c.index, c)).collect();
    Ok(collected)
}

fn emit(entries: &[Entry], collected: &Collected, params: &CorrectionParams) -> Vec<String> {
    let mut out = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let rec = match entry {
            Entry::Verbatim(h) => {
                out.push(h.to_string());
                continue;
            }
            Entry::Record(r) => r,
        };
        if let Some(c) = collected.retained.get(&idx) {
            let ad = c.ad();
            let dp4 = c.dp4();
            let line = if params.rewrite_dp4 {
                rec.with_info_values(&[("AD", &ad), ("DP4", &dp4)])
            } else {
                rec.with_info_values(&[("AD", &ad)])
            };
            out.push(line);
        } else if collected.superseded.contains(&idx)
            || (params.drop_unaccepted && collected.unaccepted.contains(&idx))
        {
            continue;
        } else {
            out.push(rec.text().to_string());
        }
    }
    out
}

/// Correct the indel lines of an in-memory VCF and return the output lines.
pub fn correct_lines<S: AsRef<str>>(
    lines: &[S],
    params: &CorrectionParams,
) -> Result<(Vec<String>, CorrectionStats)> {
    let entries = parse_entries(lines)?;
    let collected = collect(&entries, params)?;
    let stats = CorrectionStats {
        records: entries
            .iter()
            .filter(|e| matches!(e, Entry::Record(_)))
            .count(),
        candidates: collected.retained.len()
            + collected.superseded.len()
            + collected.unaccepted.len(),
        corrected: collected.retained.len(),
        superseded: collected.superseded.len(),
        unaccepted: collected.unaccepted.len(),
    };
    Ok((emit(&entries, &collected, params), stats))
}

/// Read `input`, correct it and write the result to `output`.
pub fn correct_indel_depth(
    input: &Path,
    output: &Path,
    params: &CorrectionParams,
) -> Result<CorrectionStats> {
    let lines = vcf_io::read_lines(input)?;
    let (out, stats) = correct_lines(&lines, params)?;
    vcf_io::write_lines(output, &out)?;
    info!(
        "{} records, {} deletion candidates, {} corrected, {} superseded, {} below IDV threshold ({})",
        stats.records,
        stats.candidates,
        stats.corrected,
        stats.superseded,
        stats.unaccepted,
        if params.drop_unaccepted {
            "dropped"
        } else {
            "kept"
        }
    );
    info!("wrote {}", output.display());
    Ok(stats)
}
