pub mod navigation;
pub mod restore;
