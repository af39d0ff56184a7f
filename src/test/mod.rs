mod env;
mod presentation;
mod utils;

pub use utils::test_utils;
