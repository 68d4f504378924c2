pub mod junction;
pub mod seed;
