pub mod assignment;
pub mod checkout;
pub mod lifecycle;
pub mod pricing;
pub mod scheduler;
pub mod selection;
