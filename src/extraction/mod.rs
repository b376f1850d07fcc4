pub mod bookextract;
pub mod folding;
pub mod index;
pub mod parseutil;
pub mod pdf;
pub mod rowtransform;
pub mod transform;
