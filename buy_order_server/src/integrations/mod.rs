pub mod email;
pub mod storefront;
pub mod stripe;
