pub mod depth;
pub mod error;
pub mod info;
pub mod multi_indel;
pub mod vcf_io;

pub use depth::{correct_indel_depth, CorrectionParams, CorrectionStats};
pub use error::{Error, Result};
pub use multi_indel::{filter_multi_indel, FilterStats};
