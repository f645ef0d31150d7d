pub mod controller;
pub mod reallocation;
pub mod servers;
pub mod strategy;
