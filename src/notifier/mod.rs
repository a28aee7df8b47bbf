mod relay;
mod sessions;

pub use relay::run;
pub use sessions::SessionRegistry;
