pub mod hlc;
pub mod controller;
