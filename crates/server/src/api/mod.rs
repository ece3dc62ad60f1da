pub mod audit;
pub mod campaigns;
pub mod handlers;
pub mod middleware;
pub mod operations;
pub mod routes;
pub mod stoploss;

pub use routes::create_router;
