//! Backend API types shared by the gate crates

pub mod types;
