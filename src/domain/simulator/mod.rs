pub mod control_plane;
pub mod scenario;
pub mod timeline;
