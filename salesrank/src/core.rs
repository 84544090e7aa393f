pub mod rdd;

pub mod cache;

pub mod executor;

pub mod spark;
