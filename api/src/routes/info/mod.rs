pub mod info_route;

pub use info_route::info_route;
