pub mod acl;
pub mod backend;
pub mod config;
pub mod error;
pub mod listing;
pub mod memory;
pub mod name;
pub mod node;
pub mod random_access;
pub mod tree;

pub use acl::{Acl, AclGroup, AclPermission};
pub use backend::{
    Backend, BackendError, ListPage, NativeAcl, NativeGrant, NativeGrantee, NativeGroup,
    NativeOwner, NativePermission, ObjectMeta, Summary,
};
pub use config::FsConfig;
pub use error::FsError;
pub use memory::MemoryBackend;
pub use name::{Name, NameError, NameType};
pub use node::Node;
pub use random_access::RandomAccessContent;
pub use tree::RemoteFs;
