//! Concrete carbon resources: the user, their colour theme and schools.

pub mod color;
pub mod permissions;
pub mod school;
pub mod user;

pub use color::{Color, ColorParseError, ColorTheme};
pub use permissions::{InfoPermissions, PermissionsJson};
pub use school::{School, SchoolInfo, SchoolLoader, SchoolManager};
pub use user::{User, UUID_HEADER, VERIFICATION_KEY_HEADER};
