//! Command line tools for the wildcall engine

pub mod output;
