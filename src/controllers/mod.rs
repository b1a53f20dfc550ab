pub mod illuminance_controller;
