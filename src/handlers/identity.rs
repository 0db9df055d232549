//! Caller identity. Authentication happens upstream; the gateway forwards
//! the authenticated id in a header and these extractors make it an
//! explicit handler argument.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use uuid::Uuid;

use crate::errors::AppError;

pub const USER_HEADER: &str = "X-User-Id";
pub const STAFF_HEADER: &str = "X-Staff-Id";

fn header_uuid(req: &HttpRequest, name: &str) -> Result<Uuid, AppError> {
    let value = req
        .headers()
        .get(name)
        .ok_or_else(|| AppError::Unauthorized(format!("missing {name} header")))?;
    value
        .to_str()
        .ok()
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
        .ok_or_else(|| AppError::Unauthorized(format!("malformed {name} header")))
}

/// The customer making the request.
#[derive(Debug, Clone, Copy)]
pub struct CustomerId(pub Uuid);

impl FromRequest for CustomerId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(header_uuid(req, USER_HEADER).map(CustomerId))
    }
}

/// The back-office employee making the request.
#[derive(Debug, Clone, Copy)]
pub struct StaffId(pub Uuid);

impl FromRequest for StaffId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(header_uuid(req, STAFF_HEADER).map(StaffId))
    }
}
