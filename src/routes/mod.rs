pub mod auth;

pub mod users;

pub mod schools;

pub mod clones;

pub mod discussions;

pub use auth::configure_auth_routes;
pub use clones::configure_clone_routes;
pub use discussions::configure_discussion_routes;
pub use schools::configure_school_routes;
pub use users::configure_user_routes;
