pub mod memory;
pub mod research;
