pub use aclmark_acl as acl;
pub use aclmark_core as core;
pub use aclmark_io as io;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use aclmark_acl::prelude::*;
    #[doc(hidden)]
    pub use aclmark_core::prelude::*;
    #[doc(hidden)]
    pub use aclmark_io::prelude::*;
}
