pub use crate::{
    error::Error,
    misc::{ChainLink, LatestMessage},
    store::Store,
};

mod error;
mod misc;
mod store;
