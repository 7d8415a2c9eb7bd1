//! Domain types and models

mod asset;

pub use asset::{
    AssetRecord, RemoteObject, MountPoint, MountSet,
    content_type_for, APP_STATIC_ENDPOINT, PLUGIN_STATIC_SUFFIX,
};
