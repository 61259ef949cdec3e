mod batch;
mod trainer;

pub use batch::BatchTrainer;
pub use trainer::OnlineTrainer;
