pub mod project;
pub mod sensitivity;
pub mod share_price;
