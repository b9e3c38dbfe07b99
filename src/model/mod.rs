pub mod config {
    pub use cooprings_core::config::*;
}
pub mod error {
    pub use cooprings_core::error::*;
}
pub mod metrics {
    pub use cooprings_core::metrics::*;
}
pub mod report {
    pub use cooprings_core::report::*;
}
pub mod trader {
    pub use cooprings_core::trader::*;
}
pub mod data {
    pub use cooprings_data::*;
}

pub mod system;
