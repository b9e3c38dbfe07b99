mod shutdown;
mod state;

pub use shutdown::ShutdownManager;
pub use state::App;
