pub mod core;
pub mod stat;
pub mod vcftools;
