use clap::Parser;
use indelfix::{correct_indel_depth, vcf_io, CorrectionParams};
use mimalloc::MiMalloc;
use std::path::PathBuf;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Rebuild AD for deletions whose IDV is high relative to the depth of neighboring non-indel records.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// pre-bcftools VCF. Output is written next to it as <sample>_pre1.vcf.
    #[arg(short, long)]
    file: PathBuf,

    /// write here instead of the name derived from --file.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// minimum IDV / neighbor depth for a deletion to be corrected.
    #[arg(long, default_value_t = 0.5)]
    min_idv_fraction: f64,

    /// alternate alleles at least this long are left alone.
    #[arg(long, default_value_t = 500)]
    max_indel_length: usize,

    /// drop deletions below the IDV threshold instead of keeping them unchanged.
    #[arg(long, default_value_t = false)]
    drop_unaccepted: bool,

    /// also rewrite DP4 from the corrected depths.
    #[arg(long, default_value_t = false)]
    rewrite_dp4: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // usage problems are not failures of the run
            let _ = e.print();
            std::process::exit(0);
        }
    };
    let output = args
        .output
        .unwrap_or_else(|| vcf_io::derive_output_path(&args.file));
    let params = CorrectionParams {
        min_idv_fraction: args.min_idv_fraction,
        max_indel_length: args.max_indel_length,
        drop_unaccepted: args.drop_unaccepted,
        rewrite_dp4: args.rewrite_dp4,
    };
    log::info!("correcting {} -> {}", args.file.display(), output.display());
    correct_indel_depth(&args.file, &output, &params)?;
    Ok(())
}
