use clap::Parser;
use indelfix::filter_multi_indel;
use mimalloc::MiMalloc;
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Remove the lowest-AD indel at positions reported with more than one IMF-bearing indel.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// VCF/BCF to filter. Rewritten in place unless --output is given.
    vcf_file_to_filter: PathBuf,

    /// write the filtered file here instead.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Cli::parse();
    let output = args
        .output
        .unwrap_or_else(|| args.vcf_file_to_filter.clone());
    let stats = filter_multi_indel(&args.vcf_file_to_filter, &output)?;
    for site in &stats.sites {
        log::info!(
            "filtered {}:{} AD={}",
            site.chrom,
            site.position,
            site.ad_string()
        );
    }
    Ok(())
}
