pub mod client;
pub mod records;
pub mod rest_appointment_service;
pub mod rest_closure_service;
pub mod rest_profile_service;
