//! Sea-ORM entities of the sample service

pub mod company;
pub mod position;
pub mod user;
