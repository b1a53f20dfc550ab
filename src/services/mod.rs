pub mod attenuation;
pub mod clear_sky;
pub mod daypart;
pub mod engine;
pub mod forecast;
pub mod hysteresis;
pub mod mqtt_service;
pub mod smoothing;
pub mod sun_position;
pub mod trend;
pub mod weather_service;
pub mod window_exposure;
