pub mod end_user;
pub mod group;
pub mod redirection;
pub mod registry;
