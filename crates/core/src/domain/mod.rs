pub mod classification;
pub mod customer;
pub mod forecast;
pub mod offer;
pub mod product;
