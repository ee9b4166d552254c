pub mod form;
pub mod pages;
pub mod routes;
