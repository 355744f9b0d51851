pub mod assignment;
pub mod courier;
pub mod customer;
pub mod discount;
pub mod menu;
pub mod money;
pub mod order;
pub mod payment;
