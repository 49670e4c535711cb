pub mod commands;
pub mod output;

pub use commands::{Cli, Commands};
pub use output::{print_banner, print_codes, print_error, print_matches, print_success};
