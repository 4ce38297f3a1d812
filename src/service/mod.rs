pub mod chat_view;
pub mod dashboard;
pub mod image_studio;
pub mod upload;
