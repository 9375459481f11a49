// Pipeline processing: row-wise normalization, batch-wise dedup, group-wise aggregation

pub mod aggregate;
pub mod classify;
pub mod dedup;
pub mod normalize;
