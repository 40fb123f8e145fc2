//! Administrative session endpoints under `/api/admin`. Every route is
//! mounted behind the admin role layer.

pub mod controller;
pub mod router;
