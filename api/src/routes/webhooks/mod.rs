pub mod webhook_route;

pub use webhook_route::webhook_route;
