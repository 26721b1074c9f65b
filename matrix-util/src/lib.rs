pub mod common_io; // gz-aware line readers and writers
pub mod mtx_io; // matrix market triplets
pub mod parquet; // column tables
pub mod sparse_stat; // row-wise statistics of sparse matrices
pub mod vector_stat; // mean and spread of a vector
