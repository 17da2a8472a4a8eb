pub mod playthrough;
pub mod policy;
pub mod reports;
pub mod tester;

pub use policy::parse_strategies;
pub use tester::*;
