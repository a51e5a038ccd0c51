pub mod artifact;
pub mod population;
pub mod table;
pub mod utils;
