pub mod scenario;
pub mod util;

pub use util::{parse_viewport, split_csv};
