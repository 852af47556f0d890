//! Request handler definitions
//!
//! The server's only job is to host the fulfillment workers, so the HTTP surface is limited to a health check.
//! Handlers must not block the worker thread; anything slow belongs in an async fn.
use actix_web::{get, HttpResponse, Responder};
use log::*;

#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}
