//! Data model shared by the topology, scheduler, and path builder

pub mod definitions;
pub mod path;

pub use definitions::{
    Chain, ChainElement, DataPlaneLocator, Forwarder, ForwarderLink, ServiceFunction,
    ServiceFunctionType, DEFAULT_WEIGHT,
};
pub use path::{
    FirstHop, Hop, HopOverride, PathRequest, RenderedPath, RenderedPaths, REVERSE_PATH_SUFFIX,
};
