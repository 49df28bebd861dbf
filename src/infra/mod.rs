pub mod factory;
pub mod rest;
