pub mod appointment;
pub mod calendar;
pub mod closure;
pub mod health;
