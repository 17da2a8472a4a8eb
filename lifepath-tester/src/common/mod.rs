pub mod assets;
pub mod util;

pub use assets::TesterAssets;
pub use util::{resolve_seeds, split_csv};
