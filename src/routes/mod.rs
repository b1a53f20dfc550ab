pub mod illuminance_routes;
