pub mod canonicalize;
pub mod serve;
pub mod sort;
