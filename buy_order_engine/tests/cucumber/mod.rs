mod setups;
mod steps;
pub mod world;

pub use world::BuyOrderWorld;
