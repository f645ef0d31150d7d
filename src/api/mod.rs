pub mod control_plane_dto;
