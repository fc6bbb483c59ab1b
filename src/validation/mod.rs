pub mod employee;
pub mod line;
