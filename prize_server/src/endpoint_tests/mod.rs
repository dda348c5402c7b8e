mod admin;
mod g2pay;
mod helpers;
mod mocks;
mod storefront;
