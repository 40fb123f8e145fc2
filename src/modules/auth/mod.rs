//! Session endpoints under `/api/auth`.

pub mod controller;
pub mod router;
