//! On-chain access: typed contract interfaces, the read-only accessor, and
//! the fixed-point decimal boundary.

pub mod abi;
pub mod reader;
pub mod units;

pub use reader::{ChainReader, PairReserves};
