pub mod availability;
pub mod calendar;
pub mod closure_overlap;
pub mod controller;
pub mod selection;
pub mod slots;
pub mod timezone;
pub mod views;
