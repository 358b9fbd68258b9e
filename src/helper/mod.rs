pub mod admin_helpers;
pub mod auth_events;
pub mod auth_helpers;
pub mod form_helpers;
pub mod media_helpers;
pub mod public_helpers;
pub mod resource;
pub mod sanitization_helpers;
pub mod storage_helpers;
