pub mod dto;
pub mod frame;
pub mod ports;
pub mod services;
