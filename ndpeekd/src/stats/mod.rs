pub mod hash;
pub mod store;

pub use store::NdpStats;
