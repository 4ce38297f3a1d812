pub mod chat;
pub mod dashboard;
pub mod image_studio;
pub mod sidebar;
pub mod upload;
