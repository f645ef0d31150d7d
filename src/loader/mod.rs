pub mod parser;
pub mod topology_reader;
