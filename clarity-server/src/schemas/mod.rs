//! Request / response types shared by the route handlers and the OpenAPI
//! document.

pub mod chat;
pub mod docs;
