pub mod layout;
pub mod loss;
pub mod model;
pub mod scorer;
