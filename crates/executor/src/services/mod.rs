pub mod dialog_service;
pub mod menu_service;
pub mod notification_service;
pub mod sound_service;
