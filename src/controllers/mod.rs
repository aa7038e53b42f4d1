pub mod user_controller;
pub mod vehicle_controller;
