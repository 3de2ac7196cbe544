//! Engine module: digest function, path helpers, presentation and CLI front-end

pub mod arg_parser;
pub mod cli;
pub mod hashing;
pub mod report;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{AlgorithmArg, Cli, TopologyArg};
pub use cli::{handle_run, setup_opts};
pub use hashing::{digest_bytes, digest_file};
pub use report::{sorted_entries, write_json, write_lines};
pub use tools::{key_for, path_relative_to, running_as_root};
