//! Request middleware: token verification and role gating

mod auth;

pub use auth::{
    admin_only, guides_and_staff, protect, require_role, staff_only, users_and_admins, users_only,
    CurrentUser,
};
