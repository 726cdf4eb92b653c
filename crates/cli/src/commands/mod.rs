pub mod directions;
pub mod doctor;
pub mod onboard;
pub mod replay;
