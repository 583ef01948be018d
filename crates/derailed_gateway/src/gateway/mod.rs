/// Gateway client - split into the public handle and the receive loop
mod core;
mod handlers;

pub use self::core::Gateway;
