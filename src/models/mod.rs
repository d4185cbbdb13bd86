pub mod reservation;
pub mod space;
pub mod user;

pub use reservation::*;
pub use space::*;
pub use user::*;
